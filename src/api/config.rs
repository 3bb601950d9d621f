//! 配置管理 API
//!
//! 包含 /config, /config/templates/:name 端点

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::env_map::EnvMap;
use crate::domain::settings::SaveConfigRequest;
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireSetupToken;
use crate::state::AppState;

/// 配置响应
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EnvMap>,
    pub message: String,
}

/// 创建配置管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/config", get(get_config).post(save_config))
        .route("/config/templates/:name", get(get_template))
}

/// GET /config
async fn get_config(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ConfigResponse>> {
    let config = state.env_store.parse(&state.config.env_file()).await?;
    Ok(Json(ConfigResponse {
        success: true,
        data: Some(config),
        message: "Configuration loaded successfully".to_string(),
    }))
}

/// GET /config/templates/:name
async fn get_template(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ConfigResponse>> {
    let template = state.env_store.load_template(&name).await?;
    Ok(Json(ConfigResponse {
        success: true,
        data: Some(template),
        message: format!("Template {} loaded", name),
    }))
}

/// POST /config
async fn save_config(
    _auth: RequireSetupToken,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveConfigRequest>, JsonRejection>,
) -> ApiResult<Json<ConfigResponse>> {
    let Json(req) = payload?;
    let (Some(config), Some(deployment_type)) = (req.config, req.deployment_type) else {
        return Err(ApiError::bad_request("Config and deploymentType are required"));
    };

    state
        .env_store
        .write(&state.config.env_file(), &config, deployment_type.as_str())
        .await?;

    Ok(Json(ConfigResponse {
        success: true,
        data: None,
        message: "Configuration saved successfully".to_string(),
    }))
}
