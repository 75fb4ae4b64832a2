//! 基础设施层
//!
//! 持有与外部世界交互的能力（外部进程），只暴露能力，不含业务判断。

pub mod command_runner;

pub use command_runner::{CommandOutput, CommandRunner, ToolCommand};
