//! Compose 命令网关
//!
//! 唯一允许启动外部进程的组件。白名单检查在启动进程之前完成，
//! 所有参数以独立 token 传递，从不拼接成 shell 字符串。

use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{error, info, warn};

use super::command::{CapturedOutput, CommandError, Invocation, ProcessRunner};
use crate::config::GatewayPolicy;
use crate::domain::compose::{
    CommandSpec, ComposeVerb, ExecutionFailure, ExecutionResult, FailureKind,
};

/// 服务名 / profile 名
fn name_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("name token regex is valid"))
}

fn tail_option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--tail=[0-9]{1,7}$").expect("tail option regex is valid"))
}

/// 每个子命令允许的选项
fn is_allowed_option(verb: ComposeVerb, option: &str) -> bool {
    match verb {
        ComposeVerb::Up => matches!(option, "-d" | "--detach"),
        ComposeVerb::Logs => option == "--no-color" || tail_option_regex().is_match(option),
        ComposeVerb::Build => option == "--pull",
        ComposeVerb::Config => option == "--quiet",
        ComposeVerb::Ps | ComposeVerb::Down => false,
    }
}

/// Compose 网关
#[derive(Clone)]
pub struct ComposeGateway {
    policy: Arc<GatewayPolicy>,
    runner: Arc<dyn ProcessRunner>,
}

impl ComposeGateway {
    pub fn new(policy: Arc<GatewayPolicy>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { policy, runner }
    }

    /// 检查并执行
    ///
    /// 永远返回结果对象；被拒绝时不会启动任何进程
    pub async fn execute(&self, spec: &CommandSpec) -> ExecutionResult {
        let (verb, invocation) = match self.prepare(spec) {
            Ok(prepared) => prepared,
            Err(reason) => {
                warn!(
                    verb = ?spec.verb,
                    compose_file = ?spec.compose_file,
                    reason = %reason,
                    "Rejected compose command"
                );
                return ExecutionResult::rejected(self.program_echo(), reason);
            }
        };

        let command = echo(&invocation);
        info!(
            verb = %verb,
            compose_file = %spec.compose_file,
            timeout_secs = invocation.timeout.as_secs(),
            "Running compose command"
        );

        let started = Instant::now();
        let outcome = self.runner.run(&invocation).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) => self.from_output(command, output),
            Err(e) => spawn_failure(command, e),
        };

        match result.failure_kind() {
            None => info!(verb = %verb, duration_ms = duration_ms, "Compose command succeeded"),
            Some(FailureKind::NonZeroExit) => warn!(
                verb = %verb,
                duration_ms = duration_ms,
                exit_code = ?result.exit_code,
                "Compose command failed"
            ),
            Some(kind) => error!(
                verb = %verb,
                duration_ms = duration_ms,
                kind = ?kind,
                reason = result.failure_reason().unwrap_or_default(),
                "Compose command aborted"
            ),
        }

        result
    }

    /// 白名单检查并组装参数向量
    fn prepare(&self, spec: &CommandSpec) -> Result<(ComposeVerb, Invocation), String> {
        let verb = self.policy.allowed_verb(&spec.verb).ok_or_else(|| {
            format!(
                "Docker compose command {:?} is not allowed for security reasons",
                spec.verb
            )
        })?;

        if !self.policy.is_allowed_compose_file(&spec.compose_file) {
            return Err(format!("Compose file {:?} is not allowed", spec.compose_file));
        }

        if let Some(bad) = spec.profiles.iter().find(|p| !name_token_regex().is_match(p)) {
            return Err(format!("Profile name {:?} is not allowed", bad));
        }

        if let Some(bad) = spec.options.iter().find(|o| !is_allowed_option(verb, o)) {
            return Err(format!("Option {:?} is not allowed for {}", bad, verb));
        }

        if let Some(bad) = spec.services.iter().find(|s| !name_token_regex().is_match(s)) {
            return Err(format!("Service name {:?} is not allowed", bad));
        }

        let mut args = self.policy.base_args.clone();
        args.push("-f".to_string());
        args.push(spec.compose_file.clone());
        for profile in &spec.profiles {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args.push(verb.as_str().to_string());
        args.extend(spec.options.iter().cloned());
        args.extend(spec.services.iter().cloned());

        Ok((
            verb,
            Invocation {
                program: self.policy.program.clone(),
                args,
                work_dir: self.policy.work_dir.clone(),
                timeout: self.policy.timeout_for(verb),
                max_output_bytes: self.policy.max_output_bytes,
            },
        ))
    }

    fn program_echo(&self) -> String {
        std::iter::once(self.policy.program.as_str())
            .chain(self.policy.base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn from_output(&self, command: String, output: CapturedOutput) -> ExecutionResult {
        let failure = if output.timed_out {
            Some(ExecutionFailure {
                kind: FailureKind::TimedOut,
                reason: "Command timed out and was terminated".to_string(),
            })
        } else if output.truncated {
            Some(ExecutionFailure {
                kind: FailureKind::OutputLimitExceeded,
                reason: format!(
                    "Command output exceeded the {} byte limit",
                    self.policy.max_output_bytes
                ),
            })
        } else if output.exit_code != Some(0) {
            let reason = match output.exit_code {
                Some(code) => format!("Command exited with status {}", code),
                None => "Command was terminated by a signal".to_string(),
            };
            Some(ExecutionFailure {
                kind: FailureKind::NonZeroExit,
                reason,
            })
        } else {
            None
        };

        ExecutionResult {
            success: failure.is_none(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command,
            exit_code: output.exit_code,
            failure,
        }
    }
}

fn spawn_failure(command: String, error: CommandError) -> ExecutionResult {
    ExecutionResult {
        success: false,
        stdout: String::new(),
        stderr: String::new(),
        command,
        exit_code: None,
        failure: Some(ExecutionFailure {
            kind: FailureKind::SpawnFailed,
            reason: error.to_string(),
        }),
    }
}

/// 仅用于展示和日志
fn echo(invocation: &Invocation) -> String {
    std::iter::once(invocation.program.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
