//! External process execution
//!
//! Two ways to run a tool:
//!
//! - [`CommandSpec::run_buffered`] runs to completion and returns the full
//!   stdout/stderr plus exit code, optionally bounded by a timeout.
//! - [`CommandSpec::spawn_streamed`] returns a [`ProcessHandle`] whose
//!   [`next_line`](ProcessHandle::next_line) yields stdout and stderr lines
//!   interleaved in arrival order, and whose [`wait`](ProcessHandle::wait) or
//!   [`terminate`](ProcessHandle::terminate) reaps the child exactly once.
//!   Output that is not valid UTF-8 is decoded lossily rather than failing.
//!
//! Every child is spawned with `kill_on_drop`, so a handle or buffered future
//! that is dropped early (client gone, timeout) does not leak the process.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// How a command's output is delivered to the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Run to completion, collect everything
    Buffered,
    /// Expose a live, merged line stream
    Streamed,
}

impl RunMode {
    /// Mode matching a request's delivery preference
    pub fn for_streaming(wants_streaming: bool) -> Self {
        if wants_streaming {
            RunMode::Streamed
        } else {
            RunMode::Buffered
        }
    }
}

/// A program plus its arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
}

/// Collected output of a buffered run
#[must_use]
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Everything written to stdout
    pub stdout: String,
    /// Everything written to stderr
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Final state of a streamed process, produced once at exit
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Every stderr line seen, newline-joined
    pub aggregated_stderr: String,
}

impl ProcessOutcome {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl CommandSpec {
    /// Create a command for `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Short program name for messages ("yt-dlp" rather than "/usr/bin/yt-dlp")
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    /// Run to completion and collect output
    ///
    /// With a `timeout`, the child is killed and [`Error::TimedOut`] returned
    /// once the bound elapses.
    pub async fn run_buffered(&self, timeout: Option<Duration>) -> Result<ProcessOutput> {
        tracing::debug!(command = %self, "running buffered command");

        let child = self.command().spawn().map_err(|e| self.spawn_error(e))?;
        let wait = child.wait_with_output();

        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output?,
                Err(_) => {
                    tracing::warn!(
                        program = %self.program_name(),
                        timeout_secs = limit.as_secs(),
                        "command timed out, killing"
                    );
                    return Err(Error::TimedOut {
                        program: self.program_name(),
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => wait.await?,
        };

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Spawn with a live merged line stream
    pub fn spawn_streamed(&self) -> Result<ProcessHandle> {
        tracing::debug!(command = %self, "spawning streamed command");

        let mut child = self.command().spawn().map_err(|e| self.spawn_error(e))?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(Error::Other(format!(
                "{} was spawned without output pipes",
                self.program_name()
            )));
        };

        Ok(ProcessHandle {
            program: self.program_name(),
            child,
            stdout: BufReader::new(stdout).split(b'\n'),
            stderr: BufReader::new(stderr).split(b'\n'),
            stdout_open: true,
            stderr_open: true,
            stderr_buf: String::new(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A running process with merged output
///
/// Consumed by [`wait`](Self::wait) or [`terminate`](Self::terminate); if the
/// handle is dropped instead, the child is killed.
pub struct ProcessHandle {
    program: String,
    child: Child,
    stdout: Split<BufReader<ChildStdout>>,
    stderr: Split<BufReader<ChildStderr>>,
    stdout_open: bool,
    stderr_open: bool,
    stderr_buf: String,
}

impl ProcessHandle {
    /// OS process ID, if the process is still running
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Next line from either stdout or stderr, `None` once both pipes close
    ///
    /// Lines are returned in the order they become readable. Trailing `\r` is
    /// stripped and invalid UTF-8 is replaced with U+FFFD. Cancel safe:
    /// dropping the future loses no line.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if !self.stdout_open && !self.stderr_open {
                return Ok(None);
            }

            tokio::select! {
                line = self.stdout.next_segment(), if self.stdout_open => match line? {
                    Some(bytes) => return Ok(Some(decode_line(&bytes))),
                    None => self.stdout_open = false,
                },
                line = self.stderr.next_segment(), if self.stderr_open => match line? {
                    Some(bytes) => {
                        let line = decode_line(&bytes);
                        self.stderr_buf.push_str(&line);
                        self.stderr_buf.push('\n');
                        return Ok(Some(line));
                    }
                    None => self.stderr_open = false,
                },
            }
        }
    }

    /// Wait for the process to exit
    ///
    /// Any output not yet read is drained first so the child never blocks on
    /// a full pipe; drained stderr still lands in the outcome.
    pub async fn wait(mut self) -> Result<ProcessOutcome> {
        while self.next_line().await?.is_some() {}

        let status = self.child.wait().await?;
        let outcome = ProcessOutcome {
            exit_code: status.code().unwrap_or(-1),
            aggregated_stderr: self.stderr_buf,
        };
        tracing::debug!(program = %self.program, exit_code = outcome.exit_code, "process exited");
        Ok(outcome)
    }

    /// Kill the process and reap it
    pub async fn terminate(mut self) {
        tracing::info!(program = %self.program, pid = ?self.child.id(), "terminating process");
        if let Err(e) = self.child.kill().await {
            tracing::warn!(program = %self.program, error = %e, "failed to kill process");
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    trim_line_end(String::from_utf8_lossy(bytes).into_owned())
}

fn trim_line_end(mut line: String) -> String {
    while line.ends_with('\r') {
        line.pop();
    }
    line
}
