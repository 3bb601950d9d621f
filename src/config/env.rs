//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 工作目录（compose 文件与 .env 所在目录）
    pub workspace_dir: PathBuf,
    /// 前端静态文件目录
    pub public_dir: PathBuf,
    /// .env 模板目录
    pub templates_dir: PathBuf,
    /// 预设的 setup token（未设置时自动生成）
    pub setup_token: Option<String>,
    /// compose 所在的程序（`docker compose ...`）
    pub compose_program: String,
    /// OIDC JWKS 探测超时
    pub oidc_probe_timeout: Duration,
    /// DNS 查询超时
    pub dns_timeout: Duration,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = parse_or("PORT", 3000);

        let workspace_dir = env::var("WORKSPACE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/workspace"));

        let public_dir = env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public"));

        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| workspace_dir.join("templates"));

        let setup_token = env::var("SETUP_TOKEN").ok().filter(|s| !s.trim().is_empty());

        let compose_program = env::var("COMPOSE_PROGRAM").unwrap_or_else(|_| "docker".to_string());

        let oidc_probe_timeout = Duration::from_secs(parse_or(
            "OIDC_PROBE_TIMEOUT_SECS",
            constants::OIDC_PROBE_TIMEOUT_SECS,
        ));
        let dns_timeout = Duration::from_secs(parse_or("DNS_TIMEOUT_SECS", constants::DNS_TIMEOUT_SECS));

        Self {
            host,
            port,
            workspace_dir,
            public_dir,
            templates_dir,
            setup_token,
            compose_program,
            oidc_probe_timeout,
            dns_timeout,
        }
    }

    /// 当前配置文件路径
    pub fn env_file(&self) -> PathBuf {
        self.workspace_dir.join(".env")
    }
}

/// 解析数值型环境变量，无法解析时回退默认值
fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, default = %default, "Invalid numeric env value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// 常量
pub mod constants {
    /// 构建类命令超时（秒）
    pub const BUILD_TIMEOUT_SECS: u64 = 600; // 10 分钟

    /// 其他 compose 命令超时（秒）
    pub const COMMAND_TIMEOUT_SECS: u64 = 90;

    /// 每个输出流的捕获上限
    pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

    /// OIDC 探测超时（秒）
    pub const OIDC_PROBE_TIMEOUT_SECS: u64 = 5;

    /// DNS 查询超时（秒）
    pub const DNS_TIMEOUT_SECS: u64 = 5;

    /// 默认日志行数
    pub const DEFAULT_LOG_TAIL: u32 = 50;

    /// 未指定时使用的 compose 文件
    pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.production.yml";

    /// `compose ps` 输出中跳过的表头行数
    pub const STATUS_HEADER_LINES: usize = 2;

    /// 允许的 compose 文件
    pub const COMPOSE_FILES: [&str; 5] = [
        "docker-compose.yml",
        "docker-compose.production.yml",
        "docker-compose.auth.yml",
        "docker-compose.sync-syncthing.yml",
        "docker-compose.sync-rclone.yml",
    ];

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
