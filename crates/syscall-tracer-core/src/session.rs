// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One trace session: `Starting -> Running -> [Stopping ->] Completed`, or `Failed`.
//!
//! The session owns its tracer handle, its log stream and the stream's sequence
//! token for its entire lifetime and drops all of them when it returns. Lines are
//! pulled one at a time; the stop condition is consulted after each line has been
//! handled, so a line that was read is always delivered whole.

use crate::capture::{TraceProcess, TracerCommand};
use crate::delivery::{LogDelivery, LogEvent};
use async_trait::async_trait;
use std::process::ExitStatus;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const PREVIEW_WIDTH: usize = 70;

/// Decides whether a running session should stop, evaluated once per line.
#[async_trait]
pub trait StopCondition: Send + Sync {
    async fn should_stop(&self) -> bool;
}

/// Command resolved when a trace request was detected. Later changes to the
/// remote value do not affect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRequest {
    command: String,
}

impl TraceRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Running,
    Stopping,
    Completed,
    Failed,
}

/// Outcome of a session, returned to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub stream: Option<String>,
    pub status: SessionStatus,
    /// Non-empty lines pulled from the tracer, delivered or not
    pub line_count: u64,
    /// Events accepted by the sink, milestones included
    pub delivered: u64,
    /// Events lost to delivery errors
    pub dropped: u64,
    pub exit_status: Option<ExitStatus>,
    /// Ended by operator interrupt rather than by the tracer or the toggle
    pub interrupted: bool,
}

pub struct TraceSession {
    request: TraceRequest,
    delivery: LogDelivery,
    status: SessionStatus,
    line_count: u64,
    delivered: u64,
    dropped: u64,
    preview_lines: usize,
}

impl TraceSession {
    pub fn new(request: TraceRequest, delivery: LogDelivery, preview_lines: usize) -> Self {
        Self {
            request,
            delivery,
            status: SessionStatus::Starting,
            line_count: 0,
            delivered: 0,
            dropped: 0,
            preview_lines,
        }
    }

    /// Runs the session to completion.
    ///
    /// `stop` is consulted after every line; `interrupt` cancels at once, without a
    /// completion event.
    pub async fn run(
        mut self,
        tracer: &TracerCommand,
        stop: &dyn StopCondition,
        interrupt: &CancellationToken,
    ) -> SessionReport {
        if interrupt.is_cancelled() {
            info!(command = %self.request.command(), "Interrupted before tracing started");
            self.status = SessionStatus::Failed;
            return self.report(None, true);
        }

        info!(command = %self.request.command(), "Tracing");

        let mut process = match tracer.start(self.request.command()) {
            Ok(process) => process,
            Err(err) => {
                error!("Error tracing: {err}");
                self.status = SessionStatus::Failed;
                return self.report(None, false);
            }
        };

        if let Err(err) = self.delivery.open_stream().await {
            error!("Failed to create log stream, events will be dropped: {err}");
        }
        self.append(LogEvent::trace_started(self.request.command()))
            .await;

        self.status = SessionStatus::Running;
        let interrupted = self.pump(&mut process, stop, interrupt).await;

        let exit_status = match process.wait().await {
            Ok(status) => {
                debug!(%status, "Tracer exited");
                Some(status)
            }
            Err(err) => {
                warn!("Failed to reap tracer: {err}");
                None
            }
        };

        if interrupted {
            info!(
                line_count = self.line_count,
                "Trace interrupted before completion"
            );
            self.status = SessionStatus::Failed;
            return self.report(exit_status, true);
        }

        self.append(LogEvent::trace_completed(self.line_count))
            .await;
        self.status = SessionStatus::Completed;
        info!("Trace completed - {} syscalls logged", self.line_count);
        self.report(exit_status, false)
    }

    /// Moves lines from the tracer to the log stream. Returns `true` when the
    /// operator interrupt ended the loop.
    async fn pump(
        &mut self,
        process: &mut TraceProcess,
        stop: &dyn StopCondition,
        interrupt: &CancellationToken,
    ) -> bool {
        loop {
            let line = tokio::select! {
                biased;
                _ = interrupt.cancelled() => {
                    self.status = SessionStatus::Stopping;
                    process.terminate();
                    return true;
                }
                line = process.next_line() => line,
            };
            let Some(line) = line else {
                return false;
            };

            if !line.is_empty() {
                self.line_count += 1;
                self.preview(&line);
                self.append(LogEvent::syscall(&line)).await;
            }

            if stop.should_stop().await {
                info!("Toggle turned off - stopping trace");
                self.status = SessionStatus::Stopping;
                process.terminate();
                return false;
            }
        }
    }

    fn preview(&self, line: &str) {
        let line_count = usize::try_from(self.line_count).unwrap_or(usize::MAX);
        if line_count <= self.preview_lines {
            let shortened: String = line.chars().take(PREVIEW_WIDTH).collect();
            info!("  → {shortened}");
        } else if line_count == self.preview_lines + 1 {
            info!("  ... (streaming to log sink)");
        }
    }

    async fn append(&mut self, event: LogEvent) {
        match self.delivery.append(&event).await {
            Ok(()) => self.delivered += 1,
            Err(err) => {
                self.dropped += 1;
                error!("Log sink error: {err}");
            }
        }
    }

    fn report(self, exit_status: Option<ExitStatus>, interrupted: bool) -> SessionReport {
        SessionReport {
            stream: self.delivery.stream().map(str::to_owned),
            status: self.status,
            line_count: self.line_count,
            delivered: self.delivered,
            dropped: self.dropped,
            exit_status,
            interrupted,
        }
    }
}
