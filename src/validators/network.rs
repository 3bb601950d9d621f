//! 网络校验器
//!
//! DNS 记录检查与 OIDC issuer 可达性探测。真实 I/O 都藏在
//! [`DnsResolver`] / [`JwksProbe`] 后面，测试里可以替换成内存实现。

use async_trait::async_trait;
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::validation::ValidationResult;

const DOMAIN_FIELD: &str = "DOMAIN";
const ISSUER_FIELD: &str = "AUTH_OIDC_ISSUER_URL";

/// DNS 查询错误
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("{0}")]
    Lookup(String),
    #[error("DNS lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// DNS 解析器
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// A 记录
    async fn resolve_ipv4(&self, domain: &str) -> Result<Vec<Ipv4Addr>, DnsError>;
    /// AAAA 记录
    async fn resolve_ipv6(&self, domain: &str) -> Result<Vec<Ipv6Addr>, DnsError>;
}

/// 使用系统解析器（getaddrinfo）
///
/// 系统解析器一次返回两个地址族，这里按族过滤。
///
/// 注意：getaddrinfo 按 nsswitch 顺序查询，会先命中 `/etc/hosts`（以及 mDNS 等），
/// 并不只查公网 DNS 的 A / AAAA 记录。容器里的 hosts 条目可能让检查通过，
/// 而 Let's Encrypt 实际解析不到；需要严格 DNS 语义时换一个 [`DnsResolver`] 实现。
pub struct SystemDnsResolver {
    timeout: Duration,
}

impl SystemDnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn lookup(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        let lookup = tokio::net::lookup_host((domain, 0));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(addrs)) => Ok(addrs.map(|addr| addr.ip()).collect()),
            Ok(Err(e)) => Err(DnsError::Lookup(e.to_string())),
            Err(_) => Err(DnsError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn resolve_ipv4(&self, domain: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        let addrs = self.lookup(domain).await?;
        Ok(addrs
            .into_iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect())
    }

    async fn resolve_ipv6(&self, domain: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        let addrs = self.lookup(domain).await?;
        Ok(addrs
            .into_iter()
            .filter_map(|ip| match ip {
                IpAddr::V6(v6) => Some(v6),
                IpAddr::V4(_) => None,
            })
            .collect())
    }
}

/// 检查域名是否有 A 或 AAAA 记录
///
/// 解析器错误不会向上抛出，而是附在校验错误的消息里
pub async fn check_dns(resolver: &dyn DnsResolver, domain: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    let v4 = resolver.resolve_ipv4(domain).await;
    if matches!(&v4, Ok(addrs) if !addrs.is_empty()) {
        debug!(domain = %domain, "A record found");
        return result;
    }

    let v6 = resolver.resolve_ipv6(domain).await;
    if matches!(&v6, Ok(addrs) if !addrs.is_empty()) {
        debug!(domain = %domain, "AAAA record found");
        return result;
    }

    let mut message = format!(
        "No DNS records found for {} - add A or AAAA record pointing to your server",
        domain
    );
    // 两次查询的错误通常相同，只附一次
    let failures: Vec<String> = [v4.err().map(|e| e.to_string()), v6.err().map(|e| e.to_string())]
        .into_iter()
        .flatten()
        .fold(Vec::new(), |mut acc, e| {
            if !acc.contains(&e) {
                acc.push(e);
            }
            acc
        });
    if !failures.is_empty() {
        message.push_str(&format!(" (DNS lookup failed: {})", failures.join("; ")));
    }

    warn!(domain = %domain, "DNS check failed");
    result.push_error(DOMAIN_FIELD, message);
    result
}

/// 探测错误
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Transport(String),
    #[error("request cancelled")]
    Cancelled,
}

/// JWKS 端点探测
#[async_trait]
pub trait JwksProbe: Send + Sync {
    /// 请求 `url` 并返回 HTTP 状态码；`cancel` 触发时必须放弃请求
    async fn fetch_status(&self, url: &str, cancel: CancellationToken) -> Result<u16, ProbeError>;
}

/// reqwest 实现
#[derive(Clone)]
pub struct HttpJwksProbe {
    client: Client,
}

impl HttpJwksProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        // 客户端超时只是兜底，真正的超时由 check_oidc_issuer 控制
        let client = Client::builder()
            .timeout(timeout + Duration::from_secs(1))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JwksProbe for HttpJwksProbe {
    async fn fetch_status(&self, url: &str, cancel: CancellationToken) -> Result<u16, ProbeError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            response = self.client.get(url).send() => response
                .map(|r| r.status().as_u16())
                .map_err(|e| ProbeError::Transport(e.to_string())),
        }
    }
}

/// issuer 探测结果
#[derive(Debug, PartialEq, Eq)]
pub enum IssuerProbe {
    /// 200
    Reachable,
    /// 404：可用，但需要手动配置
    MissingJwks,
    /// 其他状态码
    UnexpectedStatus(u16),
    /// 连接失败
    Unreachable(String),
    /// 超时，请求已取消
    TimedOut,
}

impl IssuerProbe {
    fn from_response(response: Result<u16, ProbeError>) -> Self {
        match response {
            Ok(200) => IssuerProbe::Reachable,
            Ok(404) => IssuerProbe::MissingJwks,
            Ok(status) => IssuerProbe::UnexpectedStatus(status),
            Err(ProbeError::Cancelled) => IssuerProbe::TimedOut,
            Err(ProbeError::Transport(msg)) => IssuerProbe::Unreachable(msg),
        }
    }

    fn into_result(self) -> ValidationResult {
        let mut result = ValidationResult::ok();
        match self {
            IssuerProbe::Reachable => {}
            IssuerProbe::MissingJwks => result.push_warning(
                ISSUER_FIELD,
                "JWKS endpoint not found - manual OIDC configuration may be required",
            ),
            IssuerProbe::UnexpectedStatus(status) => {
                result.push_error(ISSUER_FIELD, format!("OIDC endpoint returned status {}", status))
            }
            IssuerProbe::Unreachable(msg) => {
                result.push_error(ISSUER_FIELD, format!("Cannot reach OIDC issuer: {}", msg))
            }
            IssuerProbe::TimedOut => result.push_error(
                ISSUER_FIELD,
                "OIDC issuer timeout - check URL and network connectivity",
            ),
        }
        result
    }
}

/// JWKS 地址
pub fn jwks_url(issuer_url: &str) -> String {
    format!("{}/.well-known/jwks.json", issuer_url.trim_end_matches('/'))
}

/// 检查 OIDC issuer 是否可达
///
/// 超时后取消令牌并丢弃进行中的请求，函数返回时不会留下悬挂请求
pub async fn check_oidc_issuer(
    probe: &dyn JwksProbe,
    issuer_url: &str,
    timeout: Duration,
) -> ValidationResult {
    if issuer_url.is_empty() {
        let mut result = ValidationResult::ok();
        result.push_error(ISSUER_FIELD, "OIDC issuer URL is required");
        return result;
    }

    if !issuer_url.starts_with("https://") && !issuer_url.starts_with("http://") {
        let mut result = ValidationResult::ok();
        result.push_error(ISSUER_FIELD, "OIDC issuer URL must start with http:// or https://");
        return result;
    }

    let url = jwks_url(issuer_url);
    let cancel = CancellationToken::new();

    let outcome = tokio::select! {
        response = probe.fetch_status(&url, cancel.clone()) => IssuerProbe::from_response(response),
        _ = tokio::time::sleep(timeout) => {
            cancel.cancel();
            IssuerProbe::TimedOut
        }
    };

    debug!(url = %url, outcome = ?outcome, "OIDC issuer probe finished");
    outcome.into_result()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 内存 DNS
    #[derive(Default)]
    pub(crate) struct StaticDns {
        pub v4: Vec<Ipv4Addr>,
        pub v6: Vec<Ipv6Addr>,
        pub fail_with: Option<String>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl DnsResolver for StaticDns {
        async fn resolve_ipv4(&self, _domain: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(msg) => Err(DnsError::Lookup(msg.clone())),
                None => Ok(self.v4.clone()),
            }
        }

        async fn resolve_ipv6(&self, _domain: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(msg) => Err(DnsError::Lookup(msg.clone())),
                None => Ok(self.v6.clone()),
            }
        }
    }

    /// 固定响应的探测器；`hang` 为 true 时永不返回
    #[derive(Default)]
    pub(crate) struct StaticProbe {
        pub status: Option<u16>,
        pub transport_error: Option<String>,
        pub hang: bool,
        pub calls: AtomicUsize,
        pub last_url: Mutex<Option<String>>,
        pub last_token: Mutex<Option<CancellationToken>>,
    }

    impl StaticProbe {
        pub fn status(status: u16) -> Self {
            Self {
                status: Some(status),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl JwksProbe for StaticProbe {
        async fn fetch_status(&self, url: &str, cancel: CancellationToken) -> Result<u16, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(url.to_string());
            *self.last_token.lock().unwrap() = Some(cancel.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            if let Some(msg) = &self.transport_error {
                return Err(ProbeError::Transport(msg.clone()));
            }
            Ok(self.status.unwrap_or(200))
        }
    }

    #[tokio::test]
    async fn test_system_resolver_reads_hosts_entries() {
        let resolver = SystemDnsResolver::new(Duration::from_secs(5));
        let v4 = resolver.resolve_ipv4("localhost").await.unwrap_or_default();
        let v6 = resolver.resolve_ipv6("localhost").await.unwrap_or_default();
        // localhost 只存在于 hosts 文件
        assert!(v4.iter().any(|ip| ip.is_loopback()) || v6.iter().any(|ip| ip.is_loopback()));
    }

    #[tokio::test]
    async fn test_dns_a_record() {
        let dns = StaticDns {
            v4: vec![Ipv4Addr::new(203, 0, 113, 7)],
            ..Default::default()
        };
        let result = check_dns(&dns, "obsidian.example.com").await;
        assert!(result.is_valid());
        // 找到 A 记录后不再查 AAAA
        assert_eq!(dns.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dns_falls_back_to_aaaa() {
        let dns = StaticDns {
            v6: vec![Ipv6Addr::LOCALHOST],
            ..Default::default()
        };
        let result = check_dns(&dns, "v6only.example.com").await;
        assert!(result.is_valid());
        assert_eq!(dns.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dns_no_records() {
        let dns = StaticDns::default();
        let result = check_dns(&dns, "empty.example.com").await;
        assert!(!result.is_valid());
        let message = &result.errors()[0].message;
        assert!(message.contains("empty.example.com"));
        assert!(message.contains("add A or AAAA record"));
        assert!(!message.contains("DNS lookup failed"));
    }

    #[tokio::test]
    async fn test_dns_resolver_failure_is_appended() {
        let dns = StaticDns {
            fail_with: Some("NXDOMAIN".to_string()),
            ..Default::default()
        };
        let result = check_dns(&dns, "missing.example.com").await;
        assert_eq!(result.errors().len(), 1);
        let message = &result.errors()[0].message;
        assert!(message.contains("missing.example.com"));
        assert!(message.ends_with("(DNS lookup failed: NXDOMAIN)"));
    }

    #[tokio::test]
    async fn test_oidc_ok() {
        let probe = StaticProbe::status(200);
        let result = check_oidc_issuer(&probe, "https://id.example.com/", Duration::from_secs(5)).await;
        assert!(result.is_valid());
        assert!(result.warnings().is_empty());
        assert_eq!(
            probe.last_url.lock().unwrap().as_deref(),
            Some("https://id.example.com/.well-known/jwks.json")
        );
    }

    #[tokio::test]
    async fn test_oidc_404_is_warning() {
        let probe = StaticProbe::status(404);
        let result = check_oidc_issuer(&probe, "https://id.example.com", Duration::from_secs(5)).await;
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_oidc_other_status_is_error() {
        let probe = StaticProbe::status(503);
        let result = check_oidc_issuer(&probe, "https://id.example.com", Duration::from_secs(5)).await;
        assert!(!result.is_valid());
        assert!(result.errors()[0].message.contains("503"));
    }

    #[tokio::test]
    async fn test_oidc_transport_error() {
        let probe = StaticProbe {
            transport_error: Some("connection refused".to_string()),
            ..Default::default()
        };
        let result = check_oidc_issuer(&probe, "http://id.internal", Duration::from_secs(5)).await;
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].message, "Cannot reach OIDC issuer: connection refused");
    }

    #[tokio::test]
    async fn test_oidc_bad_scheme_skips_probe() {
        let probe = StaticProbe::status(200);
        let result = check_oidc_issuer(&probe, "id.example.com", Duration::from_secs(5)).await;
        assert_eq!(result.errors().len(), 1);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oidc_timeout_cancels_request() {
        let probe = StaticProbe {
            hang: true,
            ..Default::default()
        };
        let result = check_oidc_issuer(&probe, "https://slow.example.com", Duration::from_secs(5)).await;
        assert!(!result.is_valid());
        assert!(result.errors()[0].message.contains("timeout"));

        let token = probe.last_token.lock().unwrap().clone().unwrap();
        assert!(token.is_cancelled());
    }
}
