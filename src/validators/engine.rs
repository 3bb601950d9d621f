//! 校验引擎
//!
//! 按请求类别调用固定顺序的校验器并合并结果。
//! 网络校验只在对应的语法校验通过后执行；不缓存、不重试。

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::field;
use super::network::{self, DnsResolver, JwksProbe};
use crate::domain::settings::{AuthSettings, BasicSettings, DomainSettings};
use crate::domain::validation::ValidationResult;

/// 校验引擎
#[derive(Clone)]
pub struct ValidationEngine {
    dns: Arc<dyn DnsResolver>,
    jwks: Arc<dyn JwksProbe>,
    probe_timeout: Duration,
}

impl ValidationEngine {
    pub fn new(dns: Arc<dyn DnsResolver>, jwks: Arc<dyn JwksProbe>, probe_timeout: Duration) -> Self {
        Self {
            dns,
            jwks,
            probe_timeout,
        }
    }

    /// PUID、PGID、TZ，以及填写了的自定义端口
    pub fn validate_basic(&self, settings: &BasicSettings) -> ValidationResult {
        let mut result = ValidationResult::ok();
        result.merge(field::validate_uid(&settings.puid, "PUID"));
        result.merge(field::validate_uid(&settings.pgid, "PGID"));
        result.merge(field::validate_timezone(&settings.tz));

        if !settings.custom_port.is_empty() {
            result.merge(field::validate_port(&settings.custom_port, "CUSTOM_PORT"));
        }

        log_outcome("basic", &result);
        result
    }

    /// 域名语法 -> DNS（语法通过时）-> 证书邮箱
    pub async fn validate_domain(&self, settings: &DomainSettings) -> ValidationResult {
        let mut result = ValidationResult::ok();

        let syntax = field::validate_domain(&settings.domain);
        let syntax_ok = syntax.is_valid();
        result.merge(syntax);

        if syntax_ok {
            result.merge(network::check_dns(self.dns.as_ref(), &settings.domain).await);
        }

        result.merge(field::validate_email(&settings.email, "CADDY_EMAIL"));

        log_outcome("domain", &result);
        result
    }

    /// OIDC issuer、client 凭据、cookie、回调地址、邮箱域名
    pub async fn validate_auth(&self, settings: &AuthSettings) -> ValidationResult {
        let mut result = ValidationResult::ok();

        result.merge(
            network::check_oidc_issuer(self.jwks.as_ref(), &settings.issuer_url, self.probe_timeout)
                .await,
        );

        if settings.client_id.is_empty() {
            result.push_error("AUTH_CLIENT_ID", "Client ID is required");
        }
        if settings.client_secret.is_empty() {
            result.push_error("AUTH_CLIENT_SECRET", "Client secret is required");
        }

        result.merge(field::validate_cookie_secret(&settings.cookie_secret));
        result.merge(field::validate_redirect_url(&settings.redirect_url, &settings.cookie_secure));
        result.merge(field::validate_email_domains(&settings.email_domains));

        log_outcome("auth", &result);
        result
    }
}

fn log_outcome(category: &str, result: &ValidationResult) {
    info!(
        category = %category,
        valid = result.is_valid(),
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "Validation finished"
    );
}
