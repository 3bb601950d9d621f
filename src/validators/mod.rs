//! 配置校验
//!
//! `field` 为纯函数校验器，`network` 做真实网络检查，`engine` 负责组合

pub mod engine;
pub mod field;
pub mod network;

pub use engine::ValidationEngine;
pub use network::{DnsResolver, HttpJwksProbe, JwksProbe, SystemDnsResolver};
