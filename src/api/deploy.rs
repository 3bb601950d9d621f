//! 部署管理 API
//!
//! 包含 /deploy/build, /deploy/start, /deploy/stop, /deploy/validate-compose,
//! /deploy/status, /deploy/logs/:service 端点

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::compose::{
    ComposeLogsQuery, ComposeLogsResponse, DeployRequest, DeployResponse, ExecutionResult,
    ServiceStatusSnapshot, StatusQuery,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireSetupToken;
use crate::state::AppState;

/// 状态响应
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub data: ServiceStatusSnapshot,
}

/// compose 文件校验响应
#[derive(Debug, Serialize)]
pub struct ComposeCheckResponse {
    pub success: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub errors: String,
}

/// 创建部署管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deploy/build", post(build))
        .route("/deploy/start", post(start))
        .route("/deploy/stop", post(stop))
        .route("/deploy/validate-compose", post(validate_compose))
        .route("/deploy/status", get(status))
        .route("/deploy/logs", get(logs))
        .route("/deploy/logs/:service", get(logs))
}

/// 请求体可省略；给了就必须是合法的 DeployRequest
fn parse_request(body: &Bytes) -> ApiResult<DeployRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DeployRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

/// 白名单拒绝转为 403
fn rejection(result: &ExecutionResult) -> ApiError {
    warn!(
        command = %result.command,
        reason = result.failure_reason().unwrap_or_default(),
        "Compose command rejected"
    );
    ApiError::rejected(result)
}

fn reject_if_blocked(result: &ExecutionResult) -> ApiResult<()> {
    if result.is_rejected() {
        return Err(rejection(result));
    }
    Ok(())
}

/// POST /deploy/build
async fn build(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<DeployResponse>> {
    let req = parse_request(&body)?;
    info!(compose_file = %req.compose_file(), "Building services");

    let result = state.orchestrator.build(req.compose_file()).await;
    reject_if_blocked(&result)?;

    Ok(Json(DeployResponse::from_execution(
        result,
        "Build completed successfully",
        "Build failed",
    )))
}

/// POST /deploy/start
async fn start(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<DeployResponse>> {
    let req = parse_request(&body)?;
    info!(
        compose_file = %req.compose_file(),
        profiles = ?req.profiles,
        "Starting services"
    );

    let result = state
        .orchestrator
        .start(req.compose_file(), &req.profiles)
        .await;
    reject_if_blocked(&result)?;

    Ok(Json(DeployResponse::from_execution(
        result,
        "Services started successfully",
        "Failed to start services",
    )))
}

/// POST /deploy/stop
async fn stop(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<DeployResponse>> {
    let req = parse_request(&body)?;
    info!(compose_file = %req.compose_file(), "Stopping services");

    let result = state.orchestrator.stop(req.compose_file()).await;
    reject_if_blocked(&result)?;

    Ok(Json(DeployResponse::from_execution(
        result,
        "Services stopped successfully",
        "Failed to stop services",
    )))
}

/// POST /deploy/validate-compose
async fn validate_compose(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ComposeCheckResponse>> {
    let req = parse_request(&body)?;
    let result = state
        .orchestrator
        .validate_compose_file(req.compose_file())
        .await;
    reject_if_blocked(&result)?;

    Ok(Json(ComposeCheckResponse {
        success: true,
        valid: result.success,
        errors: result.stderr,
    }))
}

/// GET /deploy/status
async fn status(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<StatusResponse>> {
    let snapshot = state
        .orchestrator
        .status(query.compose_file())
        .await
        .map_err(|rejected| rejection(&rejected))?;

    Ok(Json(StatusResponse {
        success: true,
        data: snapshot,
    }))
}

/// GET /deploy/logs, GET /deploy/logs/:service
async fn logs(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    service: Option<Path<String>>,
    Query(query): Query<ComposeLogsQuery>,
) -> ApiResult<Json<ComposeLogsResponse>> {
    let service = service.map(|Path(s)| s);
    let result = state
        .orchestrator
        .logs(query.compose_file(), service.as_deref(), query.tail())
        .await;
    reject_if_blocked(&result)?;

    Ok(Json(ComposeLogsResponse {
        success: result.success,
        logs: result.stdout,
        errors: result.stderr,
    }))
}
