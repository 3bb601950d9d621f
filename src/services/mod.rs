//! 服务层模块
//!
//! 编排操作、配置持久化与密钥生成

pub mod env_store;
pub mod orchestration;
pub mod secrets;
pub mod status_parser;

pub use env_store::{EnvFileError, EnvStore};
pub use orchestration::Orchestrator;
pub use status_parser::{PsTableParser, StatusParser};
