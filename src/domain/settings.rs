//! 向导提交的配置字段

use serde::Deserialize;

use super::env_map::EnvMap;
use super::validation::deserialize_raw;

/// 基础设置（第 2 步）
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicSettings {
    #[serde(default, deserialize_with = "deserialize_raw")]
    pub puid: String,
    #[serde(default, deserialize_with = "deserialize_raw")]
    pub pgid: String,
    #[serde(default, deserialize_with = "deserialize_raw")]
    pub tz: String,
    /// 可选，空串表示不校验
    #[serde(default, deserialize_with = "deserialize_raw")]
    pub custom_port: String,
}

/// 域名设置
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DomainSettings {
    #[serde(default, deserialize_with = "deserialize_raw")]
    pub domain: String,
    #[serde(default, deserialize_with = "deserialize_raw")]
    pub email: String,
}

/// OIDC 认证设置
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default, rename = "issuerURL", deserialize_with = "deserialize_raw")]
    pub issuer_url: String,
    #[serde(default, rename = "clientId", deserialize_with = "deserialize_raw")]
    pub client_id: String,
    #[serde(default, rename = "clientSecret", deserialize_with = "deserialize_raw")]
    pub client_secret: String,
    #[serde(default, rename = "cookieSecret", deserialize_with = "deserialize_raw")]
    pub cookie_secret: String,
    #[serde(default, rename = "redirectURL", deserialize_with = "deserialize_raw")]
    pub redirect_url: String,
    /// 只有字面量 "false" 才算关闭
    #[serde(default, rename = "cookieSecure", deserialize_with = "deserialize_raw")]
    pub cookie_secure: String,
    #[serde(default, rename = "emailDomains", deserialize_with = "deserialize_raw")]
    pub email_domains: String,
}

/// 部署类型，写入 .env 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentType {
    Local,
    Production,
    ProductionAuth,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Local => "local",
            DeploymentType::Production => "production",
            DeploymentType::ProductionAuth => "production-auth",
        }
    }
}

/// POST /api/config 请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    pub config: Option<EnvMap>,
    pub deployment_type: Option<DeploymentType>,
}
