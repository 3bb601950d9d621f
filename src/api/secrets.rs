//! 密钥生成 API

use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::RequireSetupToken;
use crate::services::secrets::generate_cookie_secret;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSecret {
    pub cookie_secret: String,
}

#[derive(Debug, Serialize)]
pub struct SecretResponse {
    pub success: bool,
    pub data: CookieSecret,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/secrets/cookie", get(cookie_secret))
}

/// GET /secrets/cookie
async fn cookie_secret(_auth: RequireSetupToken) -> Json<SecretResponse> {
    Json(SecretResponse {
        success: true,
        data: CookieSecret {
            cookie_secret: generate_cookie_secret(),
        },
    })
}
