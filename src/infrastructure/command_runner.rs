//! 外部命令执行器 - 基础设施层
//!
//! 只暴露"运行一个外部程序"的能力：显式工作目录、显式环境变量、超时。
//! 从不修改本进程的当前目录。

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::CompileError;

/// 错误信息中保留的 stderr 长度
const STDERR_TAIL_CHARS: usize = 800;

/// 一次外部程序调用的描述
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// 用于日志的命令行
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn envs(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.envs.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

/// 外部程序的输出
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 外部命令执行器
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 运行命令，退出码非零视为错误
    pub async fn run(&self, command: &ToolCommand) -> Result<CommandOutput, CompileError> {
        let output = self.output(command).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(CompileError::NonZeroExit {
                program: command.program_name(),
                code: output.code,
                stderr: tail(&output.stderr, STDERR_TAIL_CHARS),
            })
        }
    }

    /// 运行命令并返回输出，只有无法启动或超时才视为错误
    pub async fn output(&self, command: &ToolCommand) -> Result<CommandOutput, CompileError> {
        debug!("执行命令: {}", command.display());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.envs())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        // 超时后 future 被丢弃，kill_on_drop 负责结束子进程
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| CompileError::SpawnFailed {
                program: command.program_name(),
                source,
            })?,
            Err(_) => {
                return Err(CompileError::TimedOut {
                    program: command.program_name(),
                    timeout: self.timeout,
                })
            }
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// 程序是否在 PATH 中
    pub fn is_available(program: &str) -> bool {
        which::which(program).is_ok()
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        text.trim().to_string()
    } else {
        text.chars().skip(count - max_chars).collect::<String>().trim().to_string()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_uses_explicit_cwd_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(Duration::from_secs(10));
        let command = ToolCommand::new("sh")
            .args(["-c", "pwd; echo $DOCS_TEST_VAR"])
            .current_dir(dir.path())
            .env("DOCS_TEST_VAR", "hello");

        let output = runner.run(&command).await.unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        assert!(output.stdout.contains(&*canonical.to_string_lossy()));
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_compile_error() {
        let runner = CommandRunner::new(Duration::from_secs(10));
        let command = ToolCommand::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        match runner.run(&command).await {
            Err(CompileError::NonZeroExit { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_and_missing_program() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let slow = ToolCommand::new("sh").args(["-c", "sleep 5"]);
        assert!(matches!(
            runner.run(&slow).await,
            Err(CompileError::TimedOut { .. })
        ));

        let missing = ToolCommand::new("definitely-not-a-real-tool-4711");
        assert!(matches!(
            runner.run(&missing).await,
            Err(CompileError::SpawnFailed { .. })
        ));
        assert!(!CommandRunner::is_available("definitely-not-a-real-tool-4711"));
    }
}
