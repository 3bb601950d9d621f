//! 字段校验器
//!
//! 每个函数只检查一个字段，纯函数、无 I/O。
//! 入参是表单提交的原始字符串，空串等价于未填写。

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::validation::ValidationResult;

/// 不建议使用的默认时区
pub const UTC_SENTINEL: &str = "Etc/UTC";

/// OAuth2 回调路径
pub const OAUTH2_CALLBACK_SUFFIX: &str = "/oauth2/callback";

fn domain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$")
            .expect("domain regex is valid")
    })
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"))
}

fn base64_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9+/=_-]+$").expect("base64 regex is valid"))
}

/// PUID / PGID：0..=65535，0 给出 root 警告
pub fn validate_uid(value: &str, field: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    match value.trim().parse::<i64>() {
        Ok(n) if (0..=65535).contains(&n) => {
            if n == 0 {
                result.push_warning(
                    field,
                    format!("{}=0 means root user - not recommended for security", field),
                );
            }
        }
        _ => result.push_error(field, format!("{} must be a number between 0 and 65535", field)),
    }

    result
}

/// 时区：只要求非空；不查时区数据库
pub fn validate_timezone(tz: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if tz.is_empty() {
        result.push_error("TZ", "Timezone is required");
    } else if tz == UTC_SENTINEL {
        result.push_warning("TZ", "Using UTC timezone - consider setting your local timezone");
    }

    result
}

/// 端口：1..=65535；1..=1023（80/443 除外）给出警告
pub fn validate_port(value: &str, field: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    match value.trim().parse::<i64>() {
        Ok(port) if (1..=65535).contains(&port) => {
            if port < 1024 && port != 80 && port != 443 {
                result.push_warning(
                    field,
                    format!(
                        "Port {} is in reserved range (1-1023) - may require elevated privileges",
                        port
                    ),
                );
            }
        }
        _ => result.push_error(field, format!("{} must be between 1 and 65535", field)),
    }

    result
}

/// 域名格式
pub fn validate_domain(domain: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if domain.is_empty() {
        result.push_error("DOMAIN", "Domain is required");
        return result;
    }

    if !domain_regex().is_match(domain) {
        result.push_error("DOMAIN", "Invalid domain format (e.g., obsidian.example.com)");
    }

    if domain.ends_with(".local") || domain.ends_with(".localhost") {
        result.push_warning(
            "DOMAIN",
            "Local domains (.local, .localhost) cannot get SSL certificates from Let's Encrypt",
        );
    }

    result
}

/// 邮箱格式
pub fn validate_email(email: &str, field: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if email.is_empty() {
        result.push_error(field, "Email is required");
        return result;
    }

    if !email_regex().is_match(email) {
        result.push_error(field, "Invalid email format");
    }

    result
}

/// OAuth2 回调地址
///
/// `cookie_secure` 只有字面量 `"false"` 才表示关闭
pub fn validate_redirect_url(url: &str, cookie_secure: &str) -> ValidationResult {
    const FIELD: &str = "AUTH_REDIRECT_URL";
    let mut result = ValidationResult::ok();

    if url.is_empty() {
        result.push_error(FIELD, "OAuth2 redirect URL is required");
        return result;
    }

    let is_http = url.starts_with("http://");
    if !is_http && !url.starts_with("https://") {
        result.push_error(FIELD, "Redirect URL must start with http:// or https://");
    }

    if !url.ends_with(OAUTH2_CALLBACK_SUFFIX) {
        result.push_warning(FIELD, "Redirect URL should end with /oauth2/callback");
    }

    if is_http && cookie_secure != "false" {
        result.push_warning(FIELD, "HTTP redirect URL requires AUTH_COOKIE_SECURE=false");
    }

    result
}

/// Cookie 密钥：至少 32 个字符，建议 base64
pub fn validate_cookie_secret(secret: &str) -> ValidationResult {
    const FIELD: &str = "AUTH_COOKIE_SECRET";
    let mut result = ValidationResult::ok();

    if secret.is_empty() {
        result.push_error(FIELD, "Cookie secret is required");
        return result;
    }

    let len = secret.chars().count();
    if len < 32 {
        result.push_error(
            FIELD,
            format!("Cookie secret must be at least 32 characters (got {})", len),
        );
    }

    if !base64_regex().is_match(secret) {
        result.push_warning(FIELD, "Cookie secret should be base64-encoded for security");
    }

    result
}

/// 允许登录的邮箱域名
pub fn validate_email_domains(domains: &str) -> ValidationResult {
    const FIELD: &str = "AUTH_EMAIL_DOMAINS";
    let mut result = ValidationResult::ok();

    if domains.is_empty() {
        result.push_error(FIELD, "Email domains restriction is required");
        return result;
    }

    if domains == "*" {
        result.push_warning(
            FIELD,
            "Wildcard (*) allows ANY email domain - not recommended for production",
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(result: &ValidationResult) -> (usize, usize) {
        (result.errors().len(), result.warnings().len())
    }

    #[test]
    fn test_uid_range() {
        for value in ["1", "1000", "65535"] {
            assert_eq!(counts(&validate_uid(value, "PUID")), (0, 0), "value {}", value);
        }
        for value in ["-1", "65536", "abc", "", "10.5", "99999999999999999999"] {
            assert_eq!(counts(&validate_uid(value, "PUID")), (1, 0), "value {}", value);
        }
    }

    #[test]
    fn test_uid_zero_warns_root() {
        let result = validate_uid("0", "PGID");
        assert!(result.is_valid());
        assert_eq!(counts(&result), (0, 1));
        assert_eq!(result.warnings()[0].field, "PGID");
        assert!(result.warnings()[0].message.contains("root"));
    }

    #[test]
    fn test_uid_full_range_sweep() {
        for n in (0..=65535).step_by(97).chain([65535]) {
            let result = validate_uid(&n.to_string(), "PUID");
            assert!(result.is_valid(), "{}", n);
        }
    }

    #[test]
    fn test_timezone() {
        assert_eq!(counts(&validate_timezone("")), (1, 0));
        assert_eq!(counts(&validate_timezone("Etc/UTC")), (0, 1));
        assert_eq!(counts(&validate_timezone("Europe/Berlin")), (0, 0));
        // 不查时区数据库
        assert_eq!(counts(&validate_timezone("Not/AZone")), (0, 0));
    }

    #[test]
    fn test_port_reserved_range() {
        for port in [1, 22, 79, 81, 442, 444, 1023] {
            assert_eq!(counts(&validate_port(&port.to_string(), "CUSTOM_PORT")), (0, 1), "{}", port);
        }
        for port in [80, 443, 1024, 8080, 65535] {
            assert_eq!(counts(&validate_port(&port.to_string(), "CUSTOM_PORT")), (0, 0), "{}", port);
        }
    }

    #[test]
    fn test_port_out_of_range() {
        for value in ["0", "65536", "-80", "http", ""] {
            assert_eq!(counts(&validate_port(value, "CUSTOM_PORT")), (1, 0), "{}", value);
        }
    }

    #[test]
    fn test_domain() {
        assert_eq!(counts(&validate_domain("obsidian.example.com")), (0, 0));
        assert_eq!(counts(&validate_domain("a-b.c-d.io")), (0, 0));
        assert_eq!(counts(&validate_domain("not a domain")), (1, 0));
        assert_eq!(counts(&validate_domain("-bad.example.com")), (1, 0));
        assert_eq!(counts(&validate_domain("localhost")), (1, 0));
        assert_eq!(counts(&validate_domain("Obsidian.Example.com")), (1, 0));
        assert_eq!(counts(&validate_domain("vault.local")), (0, 1));
        assert_eq!(counts(&validate_domain("vault.localhost")), (0, 1));
    }

    #[test]
    fn test_domain_label_length() {
        let long_label = "a".repeat(64);
        assert_eq!(counts(&validate_domain(&format!("{}.example.com", long_label))), (1, 0));
        let max_label = "a".repeat(63);
        assert_eq!(counts(&validate_domain(&format!("{}.example.com", max_label))), (0, 0));
    }

    #[test]
    fn test_domain_empty_short_circuits() {
        let result = validate_domain("");
        assert_eq!(counts(&result), (1, 0));
        assert_eq!(result.errors()[0].message, "Domain is required");
    }

    #[test]
    fn test_email() {
        assert_eq!(counts(&validate_email("admin@example.com", "CADDY_EMAIL")), (0, 0));
        assert_eq!(counts(&validate_email("", "CADDY_EMAIL")), (1, 0));
        assert_eq!(counts(&validate_email("admin@localhost", "CADDY_EMAIL")), (1, 0));
        assert_eq!(counts(&validate_email("ad min@example.com", "CADDY_EMAIL")), (1, 0));
        assert_eq!(counts(&validate_email("admin", "CADDY_EMAIL")), (1, 0));
    }

    #[test]
    fn test_cookie_secret_length_31_base64() {
        let secret = "A".repeat(31);
        let result = validate_cookie_secret(&secret);
        assert_eq!(counts(&result), (1, 0));
        assert!(result.errors()[0].message.contains("got 31"));
    }

    #[test]
    fn test_cookie_secret_length_32_non_base64() {
        let secret = "!".repeat(32);
        assert_eq!(counts(&validate_cookie_secret(&secret)), (0, 1));
    }

    #[test]
    fn test_cookie_secret_url_safe_alphabet() {
        let secret = "abcDEF0123456789-_abcDEF0123456789==";
        assert_eq!(counts(&validate_cookie_secret(secret)), (0, 0));
        assert_eq!(counts(&validate_cookie_secret("")), (1, 0));
    }

    #[test]
    fn test_redirect_url_cookie_secure() {
        let secure = validate_redirect_url("http://host/oauth2/callback", "true");
        assert_eq!(counts(&secure), (0, 1));

        let insecure = validate_redirect_url("http://host/oauth2/callback", "false");
        assert_eq!(counts(&insecure), (0, 0));

        // 未填写也视为开启
        assert_eq!(counts(&validate_redirect_url("http://host/oauth2/callback", "")), (0, 1));
    }

    #[test]
    fn test_redirect_url_shape() {
        assert_eq!(counts(&validate_redirect_url("https://host/oauth2/callback", "true")), (0, 0));
        assert_eq!(counts(&validate_redirect_url("https://host/callback", "true")), (0, 1));
        assert_eq!(counts(&validate_redirect_url("ftp://host/oauth2/callback", "true")), (1, 0));
        assert_eq!(counts(&validate_redirect_url("", "true")), (1, 0));
    }

    #[test]
    fn test_email_domains() {
        assert_eq!(counts(&validate_email_domains("")), (1, 0));
        assert_eq!(counts(&validate_email_domains("*")), (0, 1));
        assert_eq!(counts(&validate_email_domains("example.com")), (0, 0));
    }

    #[test]
    fn test_validators_are_deterministic() {
        let a = validate_redirect_url("http://host/cb", "true");
        let b = validate_redirect_url("http://host/cb", "true");
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
