//! External command execution for registry queries and post-write tooling

use crate::{Error, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedCommandRunner;

/// Captured result of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal
    pub status: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Exit status description for error messages
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("status {}", code),
            None => "signal".to_string(),
        }
    }

    /// Stdout of a successful lookup, `None` when the failure output matches
    /// one of the registry's "package not found" markers (case-insensitive).
    /// Both streams are searched since some tools report errors on stdout.
    ///
    /// # Errors
    /// Any other non-zero exit becomes [`Error::CommandFailed`]
    pub fn found_stdout(self, command: &str, not_found: &[&str]) -> Result<Option<String>> {
        if self.success() {
            return Ok(Some(self.stdout));
        }

        let output = format!("{}\n{}", self.stderr, self.stdout).to_lowercase();
        if not_found.iter().any(|marker| output.contains(&marker.to_lowercase())) {
            debug!("`{}` reported package not found", command);
            return Ok(None);
        }

        Err(Error::CommandFailed {
            command: command.to_string(),
            status: self.status_text(),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Runs external commands.
///
/// Providers only talk to registries and toolchains through this trait so
/// tests can script the responses.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, optionally inside `cwd`
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned or does not finish
    /// within the runner's timeout. A non-zero exit is NOT an error here.
    async fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput>;
}

/// Render a command line for logs and errors
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Production runner using `tokio::process` with a per-command timeout
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    /// Create a runner that kills commands running longer than `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(codep_config::DEFAULT_TIMEOUT_SECS))
    }
}

#[async_trait::async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let line = command_line(program, args);
        debug!("Running `{}`", line);

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| Error::CommandSpawn {
            command: line.clone(),
            source,
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::CommandTimeout {
                command: line.clone(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|source| Error::CommandSpawn {
                command: line,
                source,
            })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// Available to unit tests and, through the `test-utils` feature, to integration tests
#[cfg(any(test, feature = "test-utils"))]
mod scripted {
    use super::{command_line, CommandOutput, CommandRunner};
    use crate::{Error, Result};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Runner answering from a fixed table of command lines.
    ///
    /// Unknown command lines produce a spawn error. Each call can be delayed so
    /// concurrent callers overlap, and calls are counted per command line.
    #[derive(Debug, Default)]
    pub struct ScriptedCommandRunner {
        responses: Mutex<HashMap<String, CommandOutput>>,
        calls: Mutex<HashMap<String, usize>>,
        total_calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedCommandRunner {
        /// Empty script
        pub fn new() -> Self {
            Self::default()
        }

        /// Delay every response by `delay`
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Answer `command` (the full command line) with `output`
        pub fn respond(self, command: &str, output: CommandOutput) -> Self {
            self.responses.lock().insert(command.to_string(), output);
            self
        }

        /// Number of times `command` was run
        pub fn calls(&self, command: &str) -> usize {
            self.calls.lock().get(command).copied().unwrap_or(0)
        }

        /// Number of commands run
        pub fn total_calls(&self) -> usize {
            self.total_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for ScriptedCommandRunner {
        async fn run(&self, program: &str, args: &[&str], _cwd: Option<&Path>) -> Result<CommandOutput> {
            let line = command_line(program, args);
            *self.calls.lock().entry(line.clone()).or_insert(0) += 1;
            self.total_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let response = self.responses.lock().get(&line).cloned();
            response.ok_or_else(|| Error::CommandSpawn {
                command: line,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no scripted response"),
            })
        }
    }
}
