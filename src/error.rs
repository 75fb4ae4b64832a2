use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
///
/// 每一类错误对应构建矩阵中的一个失败范围：配置错误可降级，
/// 编译错误只影响一个 (版本, 语言) 组合，PDF 错误永远不会让版本失败。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 隔离工作树错误
    #[error("隔离错误: {0}")]
    Isolation(#[from] IsolationError),
    /// 外部编译器错误
    #[error("编译错误: {0}")]
    Compile(#[from] CompileError),
    /// 索引文件隔离/恢复错误
    #[error("索引隔离错误: {0}")]
    Quarantine(#[from] QuarantineError),
    /// 单文件合并错误
    #[error("合并错误: {0}")]
    MergeFile(#[from] MergeFileError),
    /// PDF 生成错误
    #[error("PDF错误: {0}")]
    Pdf(#[from] PdfError),
    /// 文件系统错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误（可恢复：降级为空版本列表或默认值）
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("无法解析 JSON 配置 {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// YAML 解析失败
    #[error("无法解析 YAML 配置 {path}: {source}")]
    YamlParseFailed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    /// 版本条目不合法
    #[error("版本条目 #{index} ({name}) 不合法: {reason}")]
    InvalidVersion {
        index: usize,
        name: String,
        reason: String,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 隔离工作树错误
#[derive(Debug, Error)]
pub enum IsolationError {
    /// 本地与远程都不存在该分支
    #[error("分支 {branch} 不存在，且无法从 {remote} 获取")]
    BranchNotFound { branch: String, remote: String },
    /// 不是 git 仓库
    #[error("{path} 不是 git 仓库")]
    NotARepository { path: PathBuf },
    /// git 命令失败
    #[error("git {args} 执行失败: {stderr}")]
    GitFailed { args: String, stderr: String },
    /// 路径不在隔离根目录下，拒绝删除
    #[error("拒绝删除隔离根目录之外的路径: {path}")]
    OutsideIsolationRoot { path: PathBuf },
}

/// 外部编译器/生成器错误（只对一个 (版本, 语言) 组合致命）
#[derive(Debug, Error)]
pub enum CompileError {
    /// 进程退出码非零
    #[error("{program} 退出码 {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    /// 无法启动进程
    #[error("无法启动 {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 超时
    #[error("{program} 执行超时 ({timeout:?})")]
    TimedOut { program: String, timeout: Duration },
}

/// 索引文件隔离错误
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// 暂存复制失败
    #[error("无法暂存 {path}: {source}")]
    StageFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 原文件和暂存副本都已丢失
    #[error("原始文件 {original} 丢失，暂存副本 {staged} 也不存在")]
    OriginalLost { original: PathBuf, staged: PathBuf },
    /// 恢复失败
    #[error("无法恢复 {original}: {source}")]
    RestoreFailed {
        original: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 单个文件的语言修复失败（会以原样复制兜底）
#[derive(Debug, Error)]
pub enum MergeFileError {
    #[error("无法读取 {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("无法写入 {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// PDF 错误（所有回退都失败时以占位文件兜底）
#[derive(Debug, Error)]
pub enum PdfError {
    /// 主生成器失败
    #[error("PDF 生成器失败 (语言: {language}): {reason}")]
    GeneratorFailed { language: String, reason: String },
    /// 回退工具链全部失败
    #[error("所有 LaTeX 工具链均失败")]
    ToolchainExhausted,
    /// 生成成功但找不到产物
    #[error("找不到生成的 PDF: {expected}")]
    ArtifactMissing { expected: PathBuf },
    /// 无法清理上一次的输出目录
    #[error("无法清理旧的 PDF 输出目录 {path}: {source}")]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    /// 创建文件系统错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = AppError::from(IsolationError::BranchNotFound {
            branch: "v9".to_string(),
            remote: "origin".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("v9"));
        assert!(msg.contains("origin"));

        let err = CompileError::TimedOut {
            program: "python3".to_string(),
            timeout: Duration::from_secs(3),
        };
        assert!(err.to_string().contains("python3"));
    }
}
