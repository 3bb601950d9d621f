//! 设置令牌中间件
//!
//! 提供 `RequireSetupToken` extractor：设置完成后一律 403，否则校验 `x-setup-token`
//! header 或 `token` 查询参数

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::HeaderMap, request::Parts},
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::config::env::EnvConfig;
use crate::error::ApiError;
use crate::services::secrets::generate_setup_token;
use crate::state::AppState;

pub const SETUP_TOKEN_HEADER: &str = "x-setup-token";
pub const SETUP_TOKEN_FILE: &str = ".setup-token";
pub const SETUP_COMPLETE_FILE: &str = ".setup-complete";

/// 设置令牌 Extractor
///
/// ```ignore
/// async fn handler(_auth: RequireSetupToken, State(state): State<Arc<AppState>>) { ... }
/// ```
#[derive(Debug, Clone)]
pub struct RequireSetupToken;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireSetupToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if setup_completed(&state.config.workspace_dir).await {
            return Err(ApiError::forbidden(
                "Setup wizard is disabled. Delete .setup-complete file to re-enable.",
            ));
        }

        let query_token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|q| q.0.token);

        verify_setup_token(&parts.headers, query_token.as_deref(), &state.setup_token)
    }
}

async fn setup_completed(workspace_dir: &Path) -> bool {
    tokio::fs::try_exists(workspace_dir.join(SETUP_COMPLETE_FILE))
        .await
        .unwrap_or(false)
}

/// 校验令牌，header 优先
pub fn verify_setup_token(
    headers: &HeaderMap,
    query_token: Option<&str>,
    expected: &str,
) -> Result<RequireSetupToken, ApiError> {
    let provided = headers
        .get(SETUP_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(query_token);

    match provided {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => {
            Ok(RequireSetupToken)
        }
        Some(_) => {
            warn!("Invalid setup token provided");
            Err(ApiError::unauthorized())
        }
        None => {
            warn!("Missing setup token");
            Err(ApiError::unauthorized())
        }
    }
}

/// 解析设置令牌：环境变量 > 令牌文件 > 新生成并写入令牌文件
pub async fn resolve_setup_token(config: &EnvConfig) -> std::io::Result<String> {
    if let Some(token) = &config.setup_token {
        info!("Using setup token from SETUP_TOKEN");
        return Ok(token.clone());
    }

    let path = config.workspace_dir.join(SETUP_TOKEN_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) if !content.trim().is_empty() => {
            info!(path = %path.display(), "Using setup token from file");
            return Ok(content.trim().to_string());
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let token = generate_setup_token();
    tokio::fs::write(&path, &token).await?;
    info!(path = %path.display(), token = %token, "Generated setup token");
    info!("Access setup wizard at: /setup?token={}", token);
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tempfile::TempDir;

    #[test]
    fn test_verify_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SETUP_TOKEN_HEADER, HeaderValue::from_static("secret"));
        assert!(verify_setup_token(&headers, None, "secret").is_ok());
        assert!(verify_setup_token(&headers, None, "other").is_err());
    }

    #[test]
    fn test_verify_query_fallback() {
        let headers = HeaderMap::new();
        assert!(verify_setup_token(&headers, Some("secret"), "secret").is_ok());
        assert!(verify_setup_token(&headers, Some("secre"), "secret").is_err());
    }

    #[test]
    fn test_verify_same_length_mismatch() {
        let mut headers = HeaderMap::new();
        headers.insert(SETUP_TOKEN_HEADER, HeaderValue::from_static("secreT"));
        assert!(verify_setup_token(&headers, None, "secret").is_err());
        assert!(verify_setup_token(&HeaderMap::new(), Some(""), "secret").is_err());
    }

    #[test]
    fn test_verify_missing() {
        assert!(verify_setup_token(&HeaderMap::new(), None, "secret").is_err());
    }

    fn config_in(dir: &TempDir, token: Option<&str>) -> EnvConfig {
        let mut config = EnvConfig::from_env();
        config.workspace_dir = dir.path().to_path_buf();
        config.setup_token = token.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn test_resolve_prefers_env() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETUP_TOKEN_FILE), "from-file").unwrap();
        let token = resolve_setup_token(&config_in(&dir, Some("from-env"))).await.unwrap();
        assert_eq!(token, "from-env");
    }

    #[tokio::test]
    async fn test_resolve_reads_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETUP_TOKEN_FILE), "from-file\n").unwrap();
        let token = resolve_setup_token(&config_in(&dir, None)).await.unwrap();
        assert_eq!(token, "from-file");
    }

    #[tokio::test]
    async fn test_resolve_generates_and_persists() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, None);
        let token = resolve_setup_token(&config).await.unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(resolve_setup_token(&config).await.unwrap(), token);
    }
}
