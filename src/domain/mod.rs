//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod compose;
pub mod env_map;
pub mod settings;
pub mod validation;

// Re-exports for convenience
pub use compose::{
    CommandSpec, ComposeVerb, ExecutionFailure, ExecutionResult, FailureKind, ServiceStatusSnapshot,
};
pub use env_map::EnvMap;
pub use settings::{AuthSettings, BasicSettings, DeploymentType, DomainSettings};
pub use validation::{Severity, ValidationIssue, ValidationResult};
