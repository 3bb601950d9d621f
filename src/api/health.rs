//! 健康检查 API
//!
//! GET /health，无需设置令牌

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    success: bool,
    status: &'static str,
    timestamp: String,
    version: &'static str,
    started_at: String,
    uptime_secs: i64,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now();
    Json(HealthResponse {
        success: true,
        status: "healthy",
        timestamp: now.to_rfc3339(),
        version: VERSION,
        started_at: state.started_at.to_rfc3339(),
        uptime_secs: (now - state.started_at).num_seconds().max(0),
    })
}
