//! Compose 编排相关领域模型

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::env::constants::{DEFAULT_COMPOSE_FILE, DEFAULT_LOG_TAIL};

/// docker compose 子命令
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeVerb {
    Config,
    Ps,
    Up,
    Down,
    Logs,
    Build,
}

impl ComposeVerb {
    /// 全部可执行的子命令
    pub const ALL: [ComposeVerb; 6] = [
        ComposeVerb::Config,
        ComposeVerb::Ps,
        ComposeVerb::Up,
        ComposeVerb::Down,
        ComposeVerb::Logs,
        ComposeVerb::Build,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComposeVerb::Config => "config",
            ComposeVerb::Ps => "ps",
            ComposeVerb::Up => "up",
            ComposeVerb::Down => "down",
            ComposeVerb::Logs => "logs",
            ComposeVerb::Build => "build",
        }
    }

    /// 精确匹配，不做大小写折叠或 trim
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.as_str() == value)
    }

    /// 镜像构建很慢，单独给长超时
    pub fn is_build_class(&self) -> bool {
        matches!(self, ComposeVerb::Build)
    }
}

impl fmt::Display for ComposeVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次 compose 调用的描述
///
/// `verb`、`compose_file`、`profiles`、`services` 都是未受信任的原始字符串，
/// 由网关对照白名单检查；`options` 只能取每个子命令固定允许的几种写法
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub verb: String,
    pub compose_file: String,
    /// `--profile` 列表（放在子命令之前）
    pub profiles: Vec<String>,
    /// 子命令选项，如 `-d`、`--tail=50`
    pub options: Vec<String>,
    /// 目标服务名（放在最后）
    pub services: Vec<String>,
}

impl CommandSpec {
    pub fn new(verb: impl Into<String>, compose_file: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            compose_file: compose_file.into(),
            ..Default::default()
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.services.push(service.into());
        self
    }
}

/// 失败类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 子命令、compose 文件或参数不在白名单内
    Rejected,
    /// 进程无法启动
    SpawnFailed,
    /// 超时，进程已被终止
    TimedOut,
    /// 输出超过上限
    OutputLimitExceeded,
    /// 进程以非零状态退出
    NonZeroExit,
}

/// 失败原因
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    pub reason: String,
}

/// 执行结果
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// 回显的命令行，仅用于展示
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExecutionFailure>,
}

impl ExecutionResult {
    /// 白名单拒绝：没有任何进程被启动
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            command: command.into(),
            exit_code: None,
            failure: Some(ExecutionFailure {
                kind: FailureKind::Rejected,
                reason: reason.into(),
            }),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    pub fn is_rejected(&self) -> bool {
        self.failure_kind() == Some(FailureKind::Rejected)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.reason.as_str())
    }
}

/// 服务运行快照（每次查询重新计算）
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ServiceStatusSnapshot {
    pub running: bool,
    pub services: Vec<String>,
}

impl ServiceStatusSnapshot {
    pub fn from_services(services: Vec<String>) -> Self {
        Self {
            running: !services.is_empty(),
            services,
        }
    }
}

/// 部署请求体
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub compose_file: Option<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl DeployRequest {
    pub fn compose_file(&self) -> &str {
        compose_file_or_default(self.compose_file.as_deref())
    }
}

/// 状态查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub compose_file: Option<String>,
}

/// 日志查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeLogsQuery {
    pub compose_file: Option<String>,
    /// 保持原始文本，非数字回退到默认值
    pub tail: Option<String>,
}

impl StatusQuery {
    pub fn compose_file(&self) -> &str {
        compose_file_or_default(self.compose_file.as_deref())
    }
}

impl ComposeLogsQuery {
    pub fn compose_file(&self) -> &str {
        compose_file_or_default(self.compose_file.as_deref())
    }

    pub fn tail(&self) -> u32 {
        parse_tail(self.tail.as_deref())
    }
}

/// 空字符串也视为未指定
pub fn compose_file_or_default(value: Option<&str>) -> &str {
    match value {
        Some(file) if !file.is_empty() => file,
        _ => DEFAULT_COMPOSE_FILE,
    }
}

/// 解析日志行数；缺失、非数字或 0 时返回默认 50
pub fn parse_tail(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LOG_TAIL)
}

/// 构建/启动/停止响应
#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub success: bool,
    pub message: String,
    pub logs: String,
    pub errors: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExecutionFailure>,
}

impl DeployResponse {
    pub fn from_execution(result: ExecutionResult, ok_message: &str, failed_message: &str) -> Self {
        let message = match (&result.failure, result.success) {
            (_, true) => ok_message.to_string(),
            (Some(failure), false) => format!("{}: {}", failed_message, failure.reason),
            (None, false) => failed_message.to_string(),
        };
        Self {
            success: result.success,
            message,
            logs: result.stdout,
            errors: result.stderr,
            failure: result.failure,
        }
    }
}

/// 日志响应
#[derive(Debug, Serialize)]
pub struct ComposeLogsResponse {
    pub success: bool,
    pub logs: String,
    pub errors: String,
}
