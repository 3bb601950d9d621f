//! Compose Setup Wizard - Docker Compose 部署向导后端
//!
//! 配置校验、.env 持久化与受白名单约束的 compose 编排

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;
pub mod validators;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::env::constants::VERSION;
use crate::config::EnvConfig;
use crate::state::AppState;

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// 覆盖监听端口
    pub port_override: Option<u16>,
    /// 覆盖工作目录
    pub workspace_override: Option<PathBuf>,
}

impl RuntimeConfig {
    /// 叠加到环境配置上
    pub fn apply(&self, mut config: EnvConfig) -> EnvConfig {
        if let Some(port) = self.port_override {
            config.port = port;
        }
        if let Some(workspace) = &self.workspace_override {
            // 模板目录跟随工作目录，除非显式设置过
            if config.templates_dir == config.workspace_dir.join("templates") {
                config.templates_dir = workspace.join("templates");
            }
            config.workspace_dir = workspace.clone();
        }
        config
    }
}

/// 初始化并运行服务，直到收到退出信号
pub async fn run(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let config = runtime.apply(EnvConfig::from_env());

    info!(
        version = VERSION,
        workspace = %config.workspace_dir.display(),
        public_dir = %config.public_dir.display(),
        compose_program = %config.compose_program,
        "Starting setup wizard"
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config).await?);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
