//! 配置校验 API
//!
//! 包含 /validate/basic, /validate/domain, /validate/auth 端点
//! 校验问题总是以 200 + `{valid, errors, warnings}` 返回

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use std::sync::Arc;

use crate::domain::settings::{AuthSettings, BasicSettings, DomainSettings};
use crate::domain::validation::ValidationResult;
use crate::error::ApiResult;
use crate::middleware::RequireSetupToken;
use crate::state::AppState;

/// 创建校验路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/validate/basic", post(validate_basic))
        .route("/validate/domain", post(validate_domain))
        .route("/validate/auth", post(validate_auth))
}

/// POST /validate/basic
async fn validate_basic(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BasicSettings>, JsonRejection>,
) -> ApiResult<Json<ValidationResult>> {
    let Json(settings) = payload?;
    Ok(Json(state.engine.validate_basic(&settings)))
}

/// POST /validate/domain
async fn validate_domain(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DomainSettings>, JsonRejection>,
) -> ApiResult<Json<ValidationResult>> {
    let Json(settings) = payload?;
    Ok(Json(state.engine.validate_domain(&settings).await))
}

/// POST /validate/auth
async fn validate_auth(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuthSettings>, JsonRejection>,
) -> ApiResult<Json<ValidationResult>> {
    let Json(settings) = payload?;
    Ok(Json(state.engine.validate_auth(&settings).await))
}
