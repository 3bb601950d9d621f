//! 基础设施模块
//!
//! 封装外部进程执行

pub mod command;
pub mod compose_gateway;

pub use command::{CommandRunner, ProcessRunner};
pub use compose_gateway::ComposeGateway;
