//! 命令网关策略
//!
//! 启动时构造一次，之后只读；通过参数传给网关

use std::path::PathBuf;
use std::time::Duration;

use crate::config::env::constants::{
    BUILD_TIMEOUT_SECS, COMMAND_TIMEOUT_SECS, COMPOSE_FILES, MAX_OUTPUT_BYTES,
};
use crate::config::env::EnvConfig;
use crate::domain::compose::ComposeVerb;

/// 网关策略
#[derive(Clone, Debug)]
pub struct GatewayPolicy {
    /// 所有命令的固定工作目录
    pub work_dir: PathBuf,
    /// 可执行程序（docker）
    pub program: String,
    /// 程序后固定的前缀参数（`docker compose` 为 `["compose"]`）
    pub base_args: Vec<String>,
    /// 允许的子命令
    pub allowed_verbs: Vec<ComposeVerb>,
    /// 允许的 compose 文件名
    pub allowed_compose_files: Vec<String>,
    /// 构建类命令超时
    pub build_timeout: Duration,
    /// 其他命令超时
    pub command_timeout: Duration,
    /// 单个输出流上限
    pub max_output_bytes: usize,
}

impl GatewayPolicy {
    /// 默认白名单 + 指定工作目录
    pub fn new(work_dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        let program = program.into();
        // 独立的 docker-compose 可执行文件不需要 compose 前缀
        let base_args = if program.ends_with("docker-compose") {
            Vec::new()
        } else {
            vec!["compose".to_string()]
        };
        Self {
            work_dir: work_dir.into(),
            program,
            base_args,
            allowed_verbs: ComposeVerb::ALL.to_vec(),
            allowed_compose_files: COMPOSE_FILES.iter().map(|f| f.to_string()).collect(),
            build_timeout: Duration::from_secs(BUILD_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    pub fn from_env_config(config: &EnvConfig) -> Self {
        Self::new(config.workspace_dir.clone(), config.compose_program.clone())
    }

    /// 白名单里的子命令
    pub fn allowed_verb(&self, verb: &str) -> Option<ComposeVerb> {
        ComposeVerb::parse(verb).filter(|v| self.allowed_verbs.contains(v))
    }

    pub fn is_allowed_compose_file(&self, file: &str) -> bool {
        self.allowed_compose_files.iter().any(|f| f == file)
    }

    pub fn timeout_for(&self, verb: ComposeVerb) -> Duration {
        if verb.is_build_class() {
            self.build_timeout
        } else {
            self.command_timeout
        }
    }
}
