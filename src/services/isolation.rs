//! 隔离工作树服务 - 业务能力层
//!
//! 为每个版本提供一个检出到对应分支的独立工作树（git worktree）。
//! 目标分支就是当前分支时直接复用主工作树。

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::IsolationError;
use crate::infrastructure::{CommandOutput, CommandRunner, ToolCommand};
use crate::models::VersionSpec;

/// 工作树来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    /// 当前分支就是目标分支，直接使用主工作树
    Ambient,
    /// 新建的 git worktree
    Worktree,
    /// 隔离失败，退回主工作树（内容可能不是目标分支）
    Degraded,
}

/// 一个版本构建期间独占的源码树
#[derive(Debug, Clone)]
pub struct IsolatedTree {
    pub path: PathBuf,
    pub kind: TreeKind,
}

impl IsolatedTree {
    /// 是否与主工作树是同一个目录
    pub fn is_ambient(&self) -> bool {
        self.kind != TreeKind::Worktree
    }
}

pub struct IsolationProvider {
    runner: CommandRunner,
    ambient_root: PathBuf,
    worktrees_dir: PathBuf,
    remote: String,
    current_branch: OnceCell<Option<String>>,
}

impl IsolationProvider {
    pub fn new(config: &Config, runner: CommandRunner) -> Self {
        Self {
            runner,
            ambient_root: absolute(&config.project_root),
            worktrees_dir: absolute(&config.worktrees_dir()),
            remote: config.default_remote.clone(),
            current_branch: OnceCell::new(),
        }
    }

    /// 版本对应的工作树路径
    pub fn worktree_path(&self, spec: &VersionSpec) -> PathBuf {
        self.worktrees_dir.join(&spec.name)
    }

    /// 主工作树当前分支，只在第一次调用时读取
    ///
    /// 分离头指针状态返回 `detached-<短哈希>`；不是仓库时返回 None。
    pub async fn current_branch(&self) -> Option<String> {
        self.current_branch
            .get_or_init(|| async {
                match self.read_current_branch().await {
                    Ok(branch) => {
                        info!("当前分支: {}", branch);
                        Some(branch)
                    }
                    Err(e) => {
                        warn!("⚠️ 无法获取当前分支: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn read_current_branch(&self) -> Result<String, IsolationError> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = output.stdout.trim().to_string();
        if branch != "HEAD" {
            return Ok(branch);
        }
        let output = self.git(&["rev-parse", "--short", "HEAD"]).await?;
        Ok(format!("detached-{}", output.stdout.trim()))
    }

    /// 为版本准备源码树
    ///
    /// 只有分支在本地和远程都不存在时才返回错误；其他失败都退回主工作树。
    pub async fn acquire(&self, spec: &VersionSpec) -> Result<IsolatedTree, IsolationError> {
        if self.current_branch().await.as_deref() == Some(spec.branch.as_str()) {
            info!("目标分支 {} 就是当前分支，使用主工作树", spec.branch);
            return Ok(self.ambient(TreeKind::Ambient));
        }

        if !self.is_repository().await {
            let err = IsolationError::NotARepository {
                path: self.ambient_root.clone(),
            };
            warn!("⚠️ {}，退回主工作树构建 {}", err, spec.name);
            return Ok(self.ambient(TreeKind::Degraded));
        }

        if !self.branch_exists(&spec.branch).await {
            info!("分支 {} 不存在，尝试从 {} 获取", spec.branch, self.remote);
            if !self.fetch_branch(&spec.branch).await {
                return Err(IsolationError::BranchNotFound {
                    branch: spec.branch.clone(),
                    remote: self.remote.clone(),
                });
            }
        }

        let path = self.worktree_path(spec);
        match self.create_worktree(&path, &spec.branch).await {
            Ok(()) => Ok(IsolatedTree {
                path,
                kind: TreeKind::Worktree,
            }),
            Err(e) => {
                warn!("⚠️ 创建 worktree 失败: {}，退回主工作树", e);
                Ok(self.ambient(TreeKind::Degraded))
            }
        }
    }

    async fn create_worktree(&self, path: &Path, branch: &str) -> Result<(), IsolationError> {
        if path.exists() {
            info!("清理已存在的 worktree: {}", path.display());
            self.remove_tree(path).await?;
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IsolationError::GitFailed {
                    args: "worktree add".to_string(),
                    stderr: e.to_string(),
                })?;
        }

        info!("创建 worktree: {} -> {}", branch, path.display());
        let path_arg = path.to_string_lossy();
        self.git(&["worktree", "add", "--force", path_arg.as_ref(), branch])
            .await?;
        Ok(())
    }

    /// 释放源码树
    ///
    /// 主工作树与不存在的路径都是空操作，可重复调用。
    pub async fn release(&self, path: &Path) -> Result<(), IsolationError> {
        if self.is_ambient_path(path) {
            debug!("{} 是主工作树，无需清理", path.display());
            return Ok(());
        }
        if !path.exists() {
            debug!("{} 不存在，无需清理", path.display());
            return Ok(());
        }
        self.remove_tree(path).await?;
        info!("✓ 清理 worktree: {}", path.display());
        Ok(())
    }

    /// 删除一个工作树：身份与范围检查在任何删除之前
    async fn remove_tree(&self, path: &Path) -> Result<(), IsolationError> {
        if self.is_ambient_path(path) || !self.is_under_isolation_root(path) {
            return Err(IsolationError::OutsideIsolationRoot {
                path: path.to_path_buf(),
            });
        }

        let candidate = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.is_registered_worktree(&candidate).await {
            let path_arg = candidate.to_string_lossy();
            for args in [
                vec!["worktree", "remove", "--force", path_arg.as_ref()],
                vec!["worktree", "remove", path_arg.as_ref()],
            ] {
                if self.git(&args).await.is_ok() {
                    self.prune().await;
                    return Ok(());
                }
            }
            warn!("git worktree remove 失败，改为直接删除目录");
        }

        if let Err(e) = tokio::fs::remove_dir_all(&candidate).await {
            if candidate.exists() {
                warn!("⚠️ 删除目录 {} 失败: {}", candidate.display(), e);
            }
        }
        self.prune().await;
        Ok(())
    }

    /// 同步 git 的 worktree 记录
    pub async fn prune(&self) {
        if let Err(e) = self.git(&["worktree", "prune"]).await {
            debug!("git worktree prune 失败: {}", e);
        }
    }

    fn ambient(&self, kind: TreeKind) -> IsolatedTree {
        IsolatedTree {
            path: self.ambient_root.clone(),
            kind,
        }
    }

    fn is_ambient_path(&self, path: &Path) -> bool {
        same_path(path, &self.ambient_root)
    }

    /// 路径必须严格位于隔离根目录之下
    fn is_under_isolation_root(&self, path: &Path) -> bool {
        let (Ok(root), Ok(candidate)) = (self.worktrees_dir.canonicalize(), path.canonicalize())
        else {
            return false;
        };
        candidate != root && candidate.starts_with(&root)
    }

    async fn is_registered_worktree(&self, path: &Path) -> bool {
        let Ok(output) = self.git(&["worktree", "list", "--porcelain"]).await else {
            return false;
        };
        output
            .stdout
            .lines()
            .filter_map(|line| line.strip_prefix("worktree "))
            .any(|listed| same_path(Path::new(listed), path))
    }

    async fn is_repository(&self) -> bool {
        self.git(&["rev-parse", "--git-dir"]).await.is_ok()
    }

    async fn branch_exists(&self, branch: &str) -> bool {
        let reference = format!("refs/heads/{}", branch);
        self.git(&["show-ref", "--verify", "--quiet", &reference])
            .await
            .is_ok()
    }

    async fn fetch_branch(&self, branch: &str) -> bool {
        let refspec = format!("{}:{}", branch, branch);
        match self.git(&["fetch", &self.remote, &refspec]).await {
            Ok(_) => true,
            Err(e) => {
                warn!("无法获取分支 {}: {}", branch, e);
                false
            }
        }
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput, IsolationError> {
        let command = ToolCommand::new("git")
            .args(args)
            .current_dir(&self.ambient_root);
        self.runner
            .run(&command)
            .await
            .map_err(|e| IsolationError::GitFailed {
                args: args.join(" "),
                stderr: e.to_string(),
            })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => absolute(a) == absolute(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn provider(root: &Path) -> IsolationProvider {
        let config = Config::for_root(root);
        IsolationProvider::new(&config, CommandRunner::new(Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn test_release_ambient_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), "x").unwrap();
        let provider = provider(dir.path());

        provider.release(dir.path()).await.unwrap();
        assert!(dir.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_release_missing_path_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());
        let missing = provider.worktrees_dir.join("never-created");

        provider.release(&missing).await.unwrap();
        provider.release(&missing).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_refuses_paths_outside_isolation_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("keep.txt"), "x").unwrap();
        let provider = provider(dir.path());

        let result = provider.release(outside.path()).await;
        assert!(matches!(
            result,
            Err(IsolationError::OutsideIsolationRoot { .. })
        ));
        assert!(outside.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_release_deletes_unregistered_tree_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());
        let stale = provider.worktrees_dir.join("v1");
        std::fs::create_dir_all(stale.join("docs")).unwrap();

        provider.release(&stale).await.unwrap();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_acquire_outside_repository_degrades_to_ambient() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());
        let spec = VersionSpec {
            name: "v1".to_string(),
            display_name: "V1".to_string(),
            branch: "v1".to_string(),
            url_path: "v1".to_string(),
            description: String::new(),
        };

        let tree = provider.acquire(&spec).await.unwrap();
        assert_eq!(tree.kind, TreeKind::Degraded);
        assert!(tree.is_ambient());
        assert!(same_path(&tree.path, dir.path()));
    }
}
