//! .env 文件读写与模板加载

use chrono::Utc;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::domain::env_map::EnvMap;

/// 持久化错误
#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid variable name: {0:?}")]
    InvalidKey(String),

    #[error("Value of {0} contains a NUL byte")]
    InvalidValue(String),

    #[error("Invalid template name: {0:?}")]
    InvalidTemplateName(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),
}

impl EnvFileError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env key regex is valid"))
}

fn template_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("template name regex is valid"))
}

/// .env 存储
#[derive(Clone, Debug)]
pub struct EnvStore {
    templates_dir: PathBuf,
}

impl EnvStore {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// 读取 .env；文件不存在时返回空表
    pub async fn parse(&self, path: &Path) -> Result<EnvMap, EnvFileError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(parse_env(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(EnvMap::new()),
            Err(e) => Err(EnvFileError::io(path, e)),
        }
    }

    /// 写入 .env（先写临时文件再 rename）
    pub async fn write(&self, path: &Path, map: &EnvMap, profile: &str) -> Result<(), EnvFileError> {
        let content = render_env(map, profile)?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| EnvFileError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| EnvFileError::io(path, e))?;

        info!(
            path = %path.display(),
            profile = %profile,
            variables = map.len(),
            "Configuration written"
        );
        Ok(())
    }

    /// 加载 `<templates_dir>/<name>.env`
    pub async fn load_template(&self, name: &str) -> Result<EnvMap, EnvFileError> {
        if !template_name_regex().is_match(name) {
            return Err(EnvFileError::InvalidTemplateName(name.to_string()));
        }

        let path = self.templates_dir.join(format!("{}.env", name));
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(parse_env(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(EnvFileError::TemplateNotFound(name.to_string()))
            }
            Err(e) => Err(EnvFileError::io(&path, e)),
        }
    }
}

/// 解析 .env 文本
pub fn parse_env(content: &str) -> EnvMap {
    let mut map = EnvMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !key_regex().is_match(key) {
            continue;
        }
        map.insert(key, unquote(value.trim()));
    }

    map
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        out
    } else if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// 换行转义成 `\n` / `\r`，保证每个变量只占一行
fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$' | '`'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{}\"", escaped)
}

/// 生成 .env 文本
pub fn render_env(map: &EnvMap, profile: &str) -> Result<String, EnvFileError> {
    let mut out = String::new();
    out.push_str("# Generated by setup wizard\n");
    out.push_str(&format!("# Deployment type: {}\n", profile));
    out.push_str(&format!("# Generated at: {}\n\n", Utc::now().to_rfc3339()));

    for (key, value) in map.iter() {
        if !key_regex().is_match(key) {
            return Err(EnvFileError::InvalidKey(key.to_string()));
        }
        if value.contains('\0') {
            return Err(EnvFileError::InvalidValue(key.to_string()));
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&quote_if_needed(value));
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_env() {
        let content = "# comment\n\
                       PUID=1000\n\
                       export TZ=Europe/Berlin\n\
                       \n\
                       AUTH_EMAIL_DOMAINS=\"example.com other.org\"\n\
                       SINGLE='a b'\n\
                       EMPTY=\n\
                       not a line\n\
                       URL=http://x/?a=b\n";
        let map = parse_env(content);
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, ["PUID", "TZ", "AUTH_EMAIL_DOMAINS", "SINGLE", "EMPTY", "URL"]);
        assert_eq!(map.get("AUTH_EMAIL_DOMAINS"), Some("example.com other.org"));
        assert_eq!(map.get("SINGLE"), Some("a b"));
        assert_eq!(map.get("EMPTY"), Some(""));
        assert_eq!(map.get("URL"), Some("http://x/?a=b"));
    }

    #[test]
    fn test_render_quotes_and_escapes_newlines() {
        let map: EnvMap = [("A", "plain"), ("B", "has space"), ("C", "say \"hi\"")]
            .into_iter()
            .collect();
        let text = render_env(&map, "local").unwrap();
        assert!(text.contains("# Deployment type: local"));
        assert!(text.contains("A=plain\n"));
        assert!(text.contains("B=\"has space\"\n"));
        assert!(text.contains("C=\"say \\\"hi\\\"\"\n"));

        let injected: EnvMap = [("DOMAIN", "x.com\nSETUP_TOKEN=evil")].into_iter().collect();
        let text = render_env(&injected, "local").unwrap();
        assert!(text.contains("DOMAIN=\"x.com\\nSETUP_TOKEN=evil\"\n"));
        let parsed = parse_env(&text);
        assert_eq!(parsed.keys().collect::<Vec<_>>(), ["DOMAIN"]);
        assert_eq!(parsed.get("DOMAIN"), Some("x.com\nSETUP_TOKEN=evil"));

        let nul: EnvMap = [("DOMAIN", "x\0y")].into_iter().collect();
        assert!(matches!(render_env(&nul, "local"), Err(EnvFileError::InvalidValue(_))));

        let bad_key: EnvMap = [("BAD KEY", "x")].into_iter().collect();
        assert!(matches!(render_env(&bad_key, "local"), Err(EnvFileError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_write_then_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let store = EnvStore::new(dir.path().join("templates"));

        let map: EnvMap = [
            ("PUID", "1000"),
            ("TZ", "Europe/Berlin"),
            ("AUTH_EMAIL_DOMAINS", "a.com b.com"),
            ("AUTH_CLIENT_SECRET", "p#ss\\word"),
        ]
        .into_iter()
        .collect();
        store.write(&path, &map, "production-auth").await.unwrap();

        let parsed = store.parse(&path).await.unwrap();
        assert_eq!(parsed, map);
        assert!(!dir.path().join(".env.tmp").exists());
    }

    #[tokio::test]
    async fn test_escaped_newline_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "MOTD=\"line one\\nline two\"\n").unwrap();
        let store = EnvStore::new(dir.path());

        let loaded = store.parse(&path).await.unwrap();
        assert_eq!(loaded.get("MOTD"), Some("line one\nline two"));

        store.write(&path, &loaded, "local").await.unwrap();
        assert_eq!(store.parse(&path).await.unwrap(), loaded);
    }

    #[tokio::test]
    async fn test_parse_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = EnvStore::new(dir.path());
        let map = store.parse(&dir.path().join(".env")).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_load_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("production.env"), "DOMAIN=\nCADDY_EMAIL=\n").unwrap();
        let store = EnvStore::new(dir.path());

        let template = store.load_template("production").await.unwrap();
        assert_eq!(template.keys().collect::<Vec<_>>(), ["DOMAIN", "CADDY_EMAIL"]);

        assert!(matches!(
            store.load_template("missing").await,
            Err(EnvFileError::TemplateNotFound(_))
        ));
        assert!(matches!(
            store.load_template("../secrets").await,
            Err(EnvFileError::InvalidTemplateName(_))
        ));
    }
}
