//! 应用状态

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::{EnvConfig, GatewayPolicy};
use crate::infra::{CommandRunner, ComposeGateway};
use crate::middleware::resolve_setup_token;
use crate::services::{EnvStore, Orchestrator, PsTableParser};
use crate::validators::{HttpJwksProbe, SystemDnsResolver, ValidationEngine};

/// 应用状态
///
/// 启动后只读，没有跨请求的可变状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 设置令牌
    pub setup_token: String,
    /// 配置校验
    pub engine: ValidationEngine,
    /// compose 编排
    pub orchestrator: Orchestrator,
    /// .env 读写
    pub env_store: EnvStore,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 用真实的 DNS / HTTP / 进程实现组装状态
    pub async fn from_config(config: EnvConfig) -> anyhow::Result<Self> {
        let setup_token = resolve_setup_token(&config)
            .await
            .context("failed to resolve setup token")?;

        let jwks = HttpJwksProbe::new(config.oidc_probe_timeout)
            .context("failed to build HTTP client")?;
        let engine = ValidationEngine::new(
            Arc::new(SystemDnsResolver::new(config.dns_timeout)),
            Arc::new(jwks),
            config.oidc_probe_timeout,
        );

        let policy = Arc::new(GatewayPolicy::from_env_config(&config));
        let gateway = ComposeGateway::new(policy, Arc::new(CommandRunner));
        let orchestrator = Orchestrator::new(gateway, Arc::new(PsTableParser::default()));

        Ok(Self::with_parts(config, setup_token, engine, orchestrator))
    }

    pub fn with_parts(
        config: EnvConfig,
        setup_token: String,
        engine: ValidationEngine,
        orchestrator: Orchestrator,
    ) -> Self {
        let env_store = EnvStore::new(config.templates_dir.clone());
        Self {
            config,
            setup_token,
            engine,
            orchestrator,
            env_store,
            started_at: Utc::now(),
        }
    }
}
