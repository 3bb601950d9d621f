//! 中间件模块

pub mod setup_token;

pub use setup_token::{resolve_setup_token, RequireSetupToken};
