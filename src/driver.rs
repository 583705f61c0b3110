//! Agent session driver
//!
//! Spawns one bounded invocation of the external agent CLI per conversation
//! turn. Session continuity is threaded explicitly: the caller passes the
//! current session id in and receives the (possibly newly adopted) id back.
//! A timed-out child is actively killed, never abandoned.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;

use crate::common::config::{Config, EnvConfig, Timeouts};
use crate::common::{Error, Result};
use crate::protocol;

/// Everything returned from one agent invocation
#[derive(Debug)]
pub struct AgentInvocation {
    /// Session id for the scenario: the echoed input id, or the first
    /// non-empty id discovered in the event stream
    pub session_id: Option<String>,
    /// Well-formed protocol events in arrival order
    pub events: Vec<Value>,
    /// Count of malformed stdout lines that were skipped
    pub skipped_lines: usize,
    /// Diagnostic channel capture; never consulted for correctness
    pub stderr: String,
}

/// Caller-supplied driver options layered over the config file
#[derive(Debug, Default)]
pub struct DriverOptions {
    /// Model override; falls back to the configured default
    pub model: Option<String>,
    /// Flags passed through to the agent CLI verbatim
    pub extra_flags: Vec<String>,
    /// Working-directory hint forwarded to the agent
    pub working_dir: Option<PathBuf>,
    /// Echo spawn commands and stderr heads to the log
    pub verbose: bool,
}

/// Drives the external agent process
#[derive(Debug)]
pub struct AgentDriver {
    command: PathBuf,
    base_args: Vec<String>,
    model: String,
    extra_flags: Vec<String>,
    working_dir: Option<PathBuf>,
    env: EnvConfig,
    timeouts: Timeouts,
    reset_prompt: String,
    verbose: bool,
}

#[derive(Debug)]
struct RawOutput {
    stdout: String,
    stderr: String,
}

impl AgentDriver {
    /// Build a driver from the loaded config plus CLI options.
    ///
    /// Resolves the agent command up front so a missing binary fails the
    /// run with an actionable message instead of failing every turn.
    pub fn new(config: &Config, options: DriverOptions) -> Result<Self> {
        let command = which::which(&config.agent.command)
            .map_err(|_| Error::AgentNotFound(config.agent.command.clone()))?;

        Ok(Self {
            command,
            base_args: config.agent.args.clone(),
            model: options
                .model
                .unwrap_or_else(|| config.defaults.model.clone()),
            extra_flags: options.extra_flags,
            working_dir: options.working_dir,
            env: config.env.clone(),
            timeouts: config.timeouts.clone(),
            reset_prompt: config.reset.prompt.clone(),
            verbose: options.verbose,
        })
    }

    /// Send one turn's message to the agent and capture its event stream.
    ///
    /// Passing `session_id` resumes the existing conversation; the returned
    /// id must be supplied on every subsequent turn of the same scenario.
    pub async fn send(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<AgentInvocation> {
        let mut args = self.base_args.clone();
        args.extend(
            ["-p", prompt, "--output-format", "stream-json", "--verbose"].map(String::from),
        );
        args.extend(["--model".to_string(), self.model.clone()]);
        if let Some(sid) = session_id {
            args.extend(["--resume".to_string(), sid.to_string()]);
        }
        if let Some(dir) = &self.working_dir {
            args.extend(["--add-dir".to_string(), dir.display().to_string()]);
        }
        args.push("--dangerously-skip-permissions".to_string());
        args.extend(self.extra_flags.iter().cloned());

        let raw = self
            .invoke(&args, Duration::from_secs(self.timeouts.turn_secs))
            .await?;

        let (events, skipped_lines) = protocol::decode_events(&raw.stdout);
        let session_id = session_id
            .map(str::to_string)
            .or_else(|| protocol::first_session_id(&events));

        Ok(AgentInvocation {
            session_id,
            events,
            skipped_lines,
            stderr: raw.stderr,
        })
    }

    /// Best-effort instruction to clear external mutable state.
    ///
    /// Runs under its own timeout before a scenario's first turn. Callers
    /// log a failure and proceed; reset never blocks scenario execution.
    pub async fn reset(&self) -> Result<()> {
        let mut args = self.base_args.clone();
        args.extend(["-p".to_string(), self.reset_prompt.clone()]);
        args.extend(
            [
                "--output-format",
                "json",
                "--verbose",
                "--dangerously-skip-permissions",
                "--max-turns",
                "2",
            ]
            .map(String::from),
        );
        args.extend(["--model".to_string(), self.model.clone()]);
        if let Some(dir) = &self.working_dir {
            args.extend(["--add-dir".to_string(), dir.display().to_string()]);
        }

        self.invoke(&args, Duration::from_secs(self.timeouts.reset_secs))
            .await
            .map(|_| ())
    }

    /// One-shot auxiliary evaluation call for the quality checker.
    ///
    /// Returns raw stdout; envelope decoding lives with the caller.
    pub async fn judge(&self, prompt: &str) -> Result<String> {
        let mut args = self.base_args.clone();
        args.extend(
            [
                "-p",
                prompt,
                "--output-format",
                "json",
                "--verbose",
                "--dangerously-skip-permissions",
                "--max-turns",
                "1",
            ]
            .map(String::from),
        );

        let raw = self
            .invoke(&args, Duration::from_secs(self.timeouts.judge_secs))
            .await
            .map_err(|e| Error::JudgeUnavailable(e.to_string()))?;
        Ok(raw.stdout)
    }

    /// Spawn one bounded agent invocation and capture both channels.
    async fn invoke(&self, args: &[String], timeout: Duration) -> Result<RawOutput> {
        if self.verbose {
            tracing::debug!(
                "spawning: {} {}",
                self.command.display(),
                args.join(" ")
            );
        }

        let mut cmd = TokioCommand::new(&self.command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if !self.env.inherit {
            cmd.env_clear();
        }
        for key in &self.env.excluded_keys {
            cmd.env_remove(key);
        }
        cmd.envs(&self.env.extra);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(Error::AgentSpawn)?;
        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("child stdout not captured".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("child stderr not captured".to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let io = async {
            tokio::try_join!(
                stdout_pipe.read_to_end(&mut stdout),
                stderr_pipe.read_to_end(&mut stderr),
                child.wait(),
            )
        };

        // Bind before matching so the io future (and its borrow of the
        // child) is dropped before the timeout arm kills it
        let outcome = tokio::time::timeout(timeout, io).await;
        let status = match outcome {
            Ok(joined) => joined?.2,
            Err(_) => {
                let _ = child.kill().await;
                return Err(Error::ProcessTimeout(timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if self.verbose {
            for line in stderr.lines().take(5) {
                tracing::debug!("agent stderr: {}", line);
            }
        }

        // A failed process that produced no events has nothing to parse
        if !status.success() && stdout.trim().is_empty() {
            let head: String = stderr.lines().take(3).collect::<Vec<_>>().join(" | ");
            return Err(Error::AgentProcess(format!(
                "exit {:?}: {}",
                status.code(),
                head
            )));
        }

        Ok(RawOutput { stdout, stderr })
    }
}
