// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracer subprocess capture.
//!
//! The traced command is split with shell-word semantics and appended to the
//! tracer's fixed flags. The tracer writes its diagnostics to stderr, which is
//! exposed here as a pull-based sequence of trimmed lines.

use crate::error::SpawnError;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, warn};

/// Tracer program plus the fixed flags placed before the traced command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerCommand {
    program: String,
    flags: Vec<String>,
}

impl TracerCommand {
    pub fn new(program: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            program: program.into(),
            flags,
        }
    }

    /// `strace` following forks, with microsecond timestamps, per-call timing and
    /// strings truncated to `max_string_length`.
    pub fn strace(program: impl Into<String>, max_string_length: usize) -> Self {
        Self::new(
            program,
            vec![
                "-f".to_string(),
                "-tt".to_string(),
                "-T".to_string(),
                "-s".to_string(),
                max_string_length.to_string(),
            ],
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector handed to the tracer for `command`.
    pub fn argv(&self, command: &str) -> Result<Vec<String>, SpawnError> {
        let words = shell_words::split(command)
            .map_err(|err| SpawnError::InvalidCommand(format!("{command:?}: {err}")))?;
        if words.is_empty() {
            return Err(SpawnError::EmptyCommand);
        }

        let mut argv = self.flags.clone();
        argv.extend(words);
        Ok(argv)
    }

    /// Spawns the tracer around `command`.
    pub fn start(&self, command: &str) -> Result<TraceProcess, SpawnError> {
        let argv = self.argv(command)?;

        let mut child = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpawnError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = child.stderr.take().map(BufReader::new);
        debug!(
            pid = child.id(),
            program = %self.program,
            "Tracer started"
        );

        Ok(TraceProcess {
            child,
            stderr,
            line: Vec::new(),
            terminated: false,
        })
    }
}

/// Handle on a running tracer
#[derive(Debug)]
pub struct TraceProcess {
    child: Child,
    stderr: Option<BufReader<ChildStderr>>,
    line: Vec<u8>,
    terminated: bool,
}

impl TraceProcess {
    /// Next trimmed line of diagnostic output, or `None` once the stream is closed.
    ///
    /// Bytes that are not valid UTF-8 are replaced, never fatal. I/O failures end
    /// the stream: whatever was captured so far stands.
    pub async fn next_line(&mut self) -> Option<String> {
        let stderr = self.stderr.as_mut()?;
        self.line.clear();
        match stderr.read_until(b'\n', &mut self.line).await {
            Ok(0) => {
                self.stderr = None;
                None
            }
            Ok(_) => Some(String::from_utf8_lossy(&self.line).trim().to_string()),
            Err(err) => {
                warn!("Failed to read tracer output, ending capture: {err}");
                self.stderr = None;
                None
            }
        }
    }

    /// Sends a graceful termination signal and releases the output stream.
    ///
    /// Calling it again, or after the tracer exited on its own, does nothing.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.stderr = None;

        let Some(pid) = self.child.id() else {
            debug!("Tracer already exited, nothing to terminate");
            return;
        };
        send_sigterm(&mut self.child, pid);
    }

    /// Waits for the tracer to exit. Must follow a drained stream or [`Self::terminate`].
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }
}

#[cfg(unix)]
fn send_sigterm(_child: &mut Child, pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw_pid) = i32::try_from(pid) else {
        warn!(pid, "Tracer pid out of range, unable to signal it");
        return;
    };
    match kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        Ok(()) => debug!(pid, "Sent SIGTERM to tracer"),
        Err(Errno::ESRCH) => debug!(pid, "Tracer exited before SIGTERM"),
        Err(err) => warn!(pid, "Failed to send SIGTERM to tracer: {err}"),
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child, pid: u32) {
    if let Err(err) = child.start_kill() {
        warn!(pid, "Failed to kill tracer: {err}");
    }
}
