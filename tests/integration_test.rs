//! 端到端构建测试
//!
//! 用一个 shell 脚本代替 Python 解释器：`-m sphinx.cmd.build -b html` 时
//! 在输出目录写入两个页面，其他调用直接成功。
#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use docs_builder::services::pdf_publisher::{FALLBACK_PDF_NAME, PLACEHOLDER_TEXT};
use docs_builder::workflow::BuildStage;
use docs_builder::{App, CommandRunner, Config, VersionState};

const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" = "-m" ]; then
  builder=""
  prev=""
  out=""
  for a in "$@"; do
    if [ "$prev" = "-b" ]; then builder="$a"; fi
    prev="$a"
    out="$a"
  done
  if [ "$builder" = "html" ]; then
    mkdir -p "$out/_static"
    printf '<html><body><a href="guide.html#top">guide</a> <a href="https://example.com/a.html">ext</a></body></html>' > "$out/$SPHINX_MASTER_DOC.html"
    printf '<html><body>%s</body></html>' "$SPHINX_LANGUAGE" > "$out/guide.html"
    printf 'locale %s' "$SPHINX_LANGUAGE" > "$out/_static/translations.js"
  fi
fi
exit 0
"#;

/// 创建文档项目：中英文索引、版本注册表、假的 Python
fn setup_project(root: &Path, versions: &str) -> Config {
    let docs = root.join("docs/source");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("index.rst"), "Index\n=====\n").unwrap();
    fs::write(docs.join("index_zh.rst"), "索引\n====\n").unwrap();
    fs::write(docs.join("config.yaml"), "project:\n  name: Demo SDK\n").unwrap();

    fs::create_dir_all(root.join(".github")).unwrap();
    fs::write(root.join(".github/versions.json"), versions).unwrap();

    let python = root.join("fake-python.sh");
    fs::write(&python, FAKE_PYTHON).unwrap();
    fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = Config::for_root(root);
    config.python = python.to_string_lossy().into_owned();
    config.command_timeout_secs = 60;
    config
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.email=ci@example.com", "-c", "user.name=ci"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(status.status.success(), "git {:?} 失败: {:?}", args, status);
}

/// 目录下所有文件的相对路径与内容
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[tokio::test]
async fn test_builds_every_version_outside_repository() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_project(
        dir.path(),
        r#"{
            "versions": [
                {"name": "v1", "display_name": "V1", "branch": "v1", "url_path": "v1"},
                {"name": "v2", "display_name": "V2", "branch": "v2", "url_path": "v2"}
            ],
            "default_version": "v1",
            "latest_version": "v2"
        }"#,
    );
    let docs = config.ambient_docs_source();
    let versions_root = config.versions_root();
    let site_root = config.site_root();

    let app = App::initialize(config).await.unwrap();
    let summary = app.run(false).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.published, 2, "{}", summary.render());
    assert!(summary.all_published());

    for name in ["v1", "v2"] {
        let version_dir = versions_root.join(name);
        assert!(version_dir.join("index.html").is_file());
        assert!(version_dir.join("index_zh.html").is_file());
        assert!(version_dir.join("guide_zh.html").is_file());
        assert!(version_dir.join("_static/version_config.json").is_file());
        assert!(version_dir.join("version_info.html").is_file());

        let pdf = version_dir.join("_static").join(FALLBACK_PDF_NAME);
        assert_eq!(read(pdf), PLACEHOLDER_TEXT);
    }

    // 中文页面的内部链接指向中文页面，外部链接不变
    let zh_index = read(versions_root.join("v1/index_zh.html"));
    assert!(zh_index.contains(r#"href="guide_zh.html#top""#));
    assert!(zh_index.contains(r#"href="https://example.com/a.html""#));
    let en_index = read(versions_root.join("v1/index.html"));
    assert!(en_index.contains(r#"href="guide.html#top""#));

    let root_redirect = read(site_root.join("index.html"));
    assert!(root_redirect.contains("./versions/v1/index.html"));
    let versions_redirect = read(versions_root.join("index.html"));
    assert!(versions_redirect.contains("./v1/index.html"));

    // 索引文件全部恢复
    assert!(docs.join("index.rst").is_file());
    assert!(docs.join("index_zh.rst").is_file());
    assert!(app.config().summary_file().is_file());
    assert!(!app.config().variants_dir().join("v1/zh").exists());
}

#[tokio::test]
async fn test_missing_branch_fails_only_that_version() {
    if !CommandRunner::is_available("git") {
        eprintln!("未安装 git，跳过");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let config = setup_project(
        dir.path(),
        r#"{
            "versions": [
                {"name": "main", "display_name": "Main", "branch": "main", "url_path": "latest"},
                {"name": "v1", "display_name": "V1", "branch": "v1", "url_path": "v1"},
                {"name": "ghost", "display_name": "Ghost", "branch": "no-such-branch", "url_path": "ghost"}
            ],
            "default_version": "v1",
            "latest_version": "main"
        }"#,
    );
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir.path(), &["add", "docs", ".github"]);
    git(dir.path(), &["commit", "-q", "-m", "docs"]);
    git(dir.path(), &["branch", "v1"]);

    let worktree = config.worktrees_dir().join("v1");
    let versions_root = config.versions_root();
    let app = App::initialize(config).await.unwrap();
    let summary = app.run(false).await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.published, 2, "{}", summary.render());
    assert!(!summary.all_published());

    let ghost = summary.versions.iter().find(|v| v.name == "ghost").unwrap();
    assert!(matches!(
        ghost.state,
        VersionState::Failed {
            stage: BuildStage::Isolate,
            ..
        }
    ));
    assert!(!versions_root.join("ghost").exists());

    assert!(versions_root.join("latest/index.html").is_file());
    assert!(versions_root.join("v1/index.html").is_file());
    assert!(!worktree.exists(), "worktree 应该在构建后释放");
}

#[tokio::test]
async fn test_rejected_entries_count_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_project(
        dir.path(),
        r#"{
            "versions": [
                {"name": "v1", "display_name": "V1", "branch": "v1", "url_path": "v1"},
                {"name": "bad", "display_name": "Bad", "branch": "", "url_path": "bad"}
            ],
            "default_version": "missing"
        }"#,
    );
    let site_root = config.site_root();

    let app = App::initialize(config).await.unwrap();
    let summary = app.run(false).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.published, 1);
    assert_eq!(summary.failed, 1);
    assert!(read(site_root.join("index.html")).contains("./versions/latest/index.html"));
}

#[tokio::test]
async fn test_clean_removes_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_project(dir.path(), r#"{"versions": []}"#);
    let stale = config.versions_root().join("old/index.html");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old").unwrap();

    let app = App::initialize(config).await.unwrap();
    let summary = app.run(true).await.unwrap();

    assert!(summary.is_vacuous());
    assert!(!stale.exists());
    assert!(app.config().ambient_docs_source().join("index.rst").is_file());
}

#[tokio::test]
async fn test_second_run_produces_identical_site() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_project(
        dir.path(),
        r#"{
            "versions": [{"name": "v1", "display_name": "V1", "branch": "v1", "url_path": "v1"}],
            "default_version": "v1"
        }"#,
    );
    let site_root = config.site_root();
    let docs = config.ambient_docs_source();

    let app = App::initialize(config).await.unwrap();
    assert!(app.run(false).await.unwrap().all_published());
    let first = snapshot(&site_root);

    assert!(app.run(false).await.unwrap().all_published());
    let second = snapshot(&site_root);

    assert!(first.contains_key(Path::new("versions/v1/index_zh.html")));
    assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
    for (path, bytes) in &first {
        assert_eq!(Some(bytes), second.get(path), "{} 两次构建内容不同", path.display());
    }
    assert_eq!(read(docs.join("index_zh.rst")), "索引\n====\n");
    assert_eq!(read(docs.join("index.rst")), "Index\n=====\n");
}
