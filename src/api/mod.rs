//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod config;
pub mod deploy;
pub mod health;
pub mod secrets;
pub mod validate;

use axum::Router;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::state::AppState;

/// 构建完整路由
///
/// `/api/*` 为接口，其余路径交给前端静态文件（找不到时回退到 index.html）
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Health（不校验设置令牌）
        .merge(health::router())
        // Validation
        .merge(validate::router())
        // Deploy
        .merge(deploy::router())
        // Config
        .merge(config::router())
        // Secrets
        .merge(secrets::router());

    let public_dir = &state.config.public_dir;
    let static_files =
        ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html")));

    Router::new()
        .nest("/api", api)
        .fallback_service(static_files)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
