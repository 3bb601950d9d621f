//! 配置模块
//!
//! 环境变量解析与网关策略

pub mod env;
pub mod policy;

pub use env::EnvConfig;
pub use policy::GatewayPolicy;
