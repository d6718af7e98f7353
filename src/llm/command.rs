//! Subprocess-backed provider.
//!
//! Runs a configured agent CLI once per request. The prompt is substituted
//! into any argument containing `{prompt}`; when no argument does, it is
//! written to the child's stdin. Stdout lines are streamed as deltas.

use super::{collect_text, LlmChunk, LlmProvider, LlmRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Placeholder replaced by the prompt text inside configured arguments.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Default overall timeout for one invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// Timeout for waiting for the process to exit after stdout closes.
pub const PROCESS_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CommandProviderConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandProviderConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandProvider {
    config: CommandProviderConfig,
    program: PathBuf,
}

impl CommandProvider {
    /// Resolve the configured command on `PATH` (or as a path) up front so a
    /// missing binary fails at startup rather than on first generation.
    pub fn new(config: CommandProviderConfig) -> Result<Self> {
        let program = which::which(&config.command)
            .with_context(|| format!("Provider command not found: {}", config.command))?;
        Ok(Self { config, program })
    }

    pub fn config(&self) -> &CommandProviderConfig {
        &self.config
    }

    /// Arguments with the prompt substituted, plus the stdin payload if the
    /// prompt was not placed in any argument.
    fn render_args(&self, prompt: &str) -> (Vec<String>, Option<String>) {
        let mut used_placeholder = false;
        let args = self
            .config
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PROMPT_PLACEHOLDER) {
                    used_placeholder = true;
                    arg.replace(PROMPT_PLACEHOLDER, prompt)
                } else {
                    arg.clone()
                }
            })
            .collect();
        let stdin_payload = (!used_placeholder).then(|| prompt.to_string());
        (args, stdin_payload)
    }

    fn spawn(&self, request: &LlmRequest) -> Result<RunningCommand> {
        let (args, stdin_payload) = self.render_args(&request.prompt);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(if stdin_payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        if let Some(model) = &request.model {
            command.env("SPECFLOW_MODEL", model);
        }
        if let Some(temperature) = request.temperature {
            command.env("SPECFLOW_TEMPERATURE", temperature.to_string());
        }
        if let Some(max_tokens) = request.max_tokens {
            command.env("SPECFLOW_MAX_TOKENS", max_tokens.to_string());
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {} process", self.config.command))?;

        if let (Some(payload), Some(mut stdin)) = (stdin_payload, child.stdin.take()) {
            // Written from a task so a chatty child cannot deadlock on a full stdout pipe.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::warn!(error = %e, "failed to write prompt to provider stdin");
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .context("Failed to get stdout from process")?;
        let mut stderr = child
            .stderr
            .take()
            .context("Failed to get stderr from process")?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        tracing::debug!(command = %self.config.command, pid = ?child.id(), "provider process started");

        Ok(RunningCommand {
            name: self.config.command.clone(),
            child,
            lines: BufReader::new(stdout).lines(),
            stderr: stderr_task,
            deadline: Instant::now() + self.config.timeout,
            timeout: self.config.timeout,
        })
    }
}

struct RunningCommand {
    name: String,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr: JoinHandle<String>,
    deadline: Instant,
    timeout: Duration,
}

impl RunningCommand {
    /// Yields the next chunk and whether the stream continues.
    async fn next_chunk(&mut self) -> (Result<LlmChunk>, bool) {
        match tokio::time::timeout_at(self.deadline, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => (Ok(LlmChunk::Delta(format!("{}\n", line))), true),
            Ok(Ok(None)) => (self.finish().await, false),
            Ok(Err(e)) => (
                Err(anyhow::Error::new(e).context(format!("Failed to read {} stdout", self.name))),
                false,
            ),
            Err(_) => {
                let _ = self.child.kill().await;
                (
                    Err(anyhow::anyhow!(
                        "{} invocation exceeded overall timeout of {:?}",
                        self.name,
                        self.timeout
                    )),
                    false,
                )
            }
        }
    }

    async fn finish(&mut self) -> Result<LlmChunk> {
        let status = self.wait().await?;
        let stderr = (&mut self.stderr).await.unwrap_or_default();
        if status.success() {
            Ok(LlmChunk::Done)
        } else {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.name,
                status,
                stderr.trim()
            )
        }
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        match tokio::time::timeout(PROCESS_WAIT_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => anyhow::bail!("Failed to wait for {} process: {}", self.name, e),
            Err(_) => {
                let _ = self.child.kill().await;
                anyhow::bail!(
                    "{} process did not exit within {:?} after stream closed",
                    self.name,
                    PROCESS_WAIT_TIMEOUT
                )
            }
        }
    }
}

#[async_trait]
impl LlmProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.config.command
    }

    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        collect_text(self.generate_stream(request)).await
    }

    fn generate_stream<'a>(&'a self, request: &'a LlmRequest) -> BoxStream<'a, Result<LlmChunk>> {
        let running = match self.spawn(request) {
            Ok(running) => running,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };
        stream::unfold(Some(running), |state| async move {
            let mut running = state?;
            let (chunk, more) = running.next_chunk().await;
            Some((chunk, more.then_some(running)))
        })
        .boxed()
    }
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
