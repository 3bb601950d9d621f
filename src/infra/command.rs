//! 命令执行器
//!
//! 提供统一的命令执行接口，支持：
//! - 参数向量调用（不经过 shell）
//! - 超时控制，超时后杀掉整个进程组
//! - stdout/stderr 分离捕获，按流限制大小；超限立即杀掉进程组

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// 进程退出后等待读取任务收尾的时间
const READER_GRACE: Duration = Duration::from_secs(2);

/// 一次进程调用
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
    pub timeout: Duration,
    /// 每个输出流的上限
    pub max_output_bytes: usize,
}

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) | CommandError::WaitFailed(e) => Some(e),
        }
    }
}

/// 捕获的输出
#[derive(Clone, Debug, Default)]
pub struct CapturedOutput {
    /// 退出码（被信号杀死时为 None）
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// 是否因超时而终止
    pub timed_out: bool,
    /// 是否有输出流超过上限
    pub truncated: bool,
}

#[cfg(test)]
impl CapturedOutput {
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && !self.truncated
    }
}

/// 进程执行接口
///
/// 生产实现是 [`CommandRunner`]；测试替身可以直接返回预设结果
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CapturedOutput, CommandError>;
}

/// 命令执行器
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CapturedOutput, CommandError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // 独立进程组，超时时可以连同子进程一起杀掉
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(CommandError::SpawnFailed)?;

        let stdout_buf = Arc::new(Mutex::new(CappedBuffer::new(invocation.max_output_bytes)));
        let stderr_buf = Arc::new(Mutex::new(CappedBuffer::new(invocation.max_output_bytes)));
        // 任一输出流超限时触发
        let overflow = CancellationToken::new();
        let stdout_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(drain(s, stdout_buf.clone(), overflow.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(drain(s, stderr_buf.clone(), overflow.clone())));

        // 等待命令完成，支持超时
        let (exit_code, timed_out) = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(CommandError::WaitFailed)?;
                (status.code(), false)
            }
            _ = tokio::time::sleep(invocation.timeout) => {
                error!(
                    program = %invocation.program,
                    timeout_secs = invocation.timeout.as_secs(),
                    "Command timed out, killing process group"
                );
                kill_process_tree(&mut child).await;
                // 等待进程实际终止
                let code = child.wait().await.ok().and_then(|s| s.code());
                (code, true)
            }
            _ = overflow.cancelled() => {
                error!(
                    program = %invocation.program,
                    limit_bytes = invocation.max_output_bytes,
                    "Command output exceeded limit, killing process group"
                );
                kill_process_tree(&mut child).await;
                let code = child.wait().await.ok().and_then(|s| s.code());
                (code, false)
            }
        };

        // 等待日志读取完成
        finish_reader(stdout_task).await;
        finish_reader(stderr_task).await;

        let (stdout, stdout_truncated) = take_buffer(&stdout_buf);
        let (stderr, stderr_truncated) = take_buffer(&stderr_buf);

        Ok(CapturedOutput {
            exit_code,
            stdout,
            stderr,
            timed_out,
            truncated: stdout_truncated || stderr_truncated,
        })
    }
}

/// 定长缓冲：超过上限的部分丢弃但继续计数
#[derive(Debug)]
struct CappedBuffer {
    data: Vec<u8>,
    limit: usize,
    total: usize,
}

impl CappedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            total: 0,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.data.len());
        self.data.extend_from_slice(&chunk[..chunk.len().min(room)]);
        self.total += chunk.len();
    }

    fn truncated(&self) -> bool {
        self.total > self.limit
    }
}

/// 持续读取直到 EOF；超限后通知 `overflow`，并继续读，避免子进程写满管道阻塞
async fn drain<R: AsyncRead + Unpin>(
    mut reader: R,
    buffer: Arc<Mutex<CappedBuffer>>,
    overflow: CancellationToken,
) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let truncated = match buffer.lock() {
                    Ok(mut buf) => {
                        buf.push(&chunk[..n]);
                        buf.truncated()
                    }
                    Err(_) => false,
                };
                if truncated {
                    overflow.cancel();
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read command output");
                break;
            }
        }
    }
}

async fn finish_reader(task: Option<JoinHandle<()>>) {
    if let Some(mut handle) = task {
        if tokio::time::timeout(READER_GRACE, &mut handle).await.is_err() {
            // 孙进程可能仍持有管道
            warn!("Output reader did not finish in time, aborting");
            handle.abort();
        }
    }
}

fn take_buffer(buffer: &Arc<Mutex<CappedBuffer>>) -> (Vec<u8>, bool) {
    match buffer.lock() {
        Ok(mut buf) => {
            let truncated = buf.truncated();
            (std::mem::take(&mut buf.data), truncated)
        }
        Err(_) => (Vec::new(), false),
    }
}

/// 杀掉进程组，再杀掉子进程本身
async fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let group = format!("-{}", pid);
        let result = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = result {
            warn!(pid = pid, error = %e, "Failed to kill process group");
        }
    }
    let _ = child.kill().await;
}
