// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Poll loop.
//!
//! Each iteration reads the toggle and fires on a false to true transition only.
//! A fired iteration runs one session to completion before the loop continues,
//! which is what keeps at most one session alive at any time.

use crate::capture::TracerCommand;
use crate::config::TracerConfig;
use crate::delivery::LogDelivery;
use crate::log_sink::LogSink;
use crate::parameters::TraceParameters;
use crate::session::{SessionReport, TraceRequest, TraceSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Rising-edge detector over consecutive toggle reads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    /// Records `enabled` and reports whether it is a false to true transition.
    pub fn observe(&mut self, enabled: bool) -> bool {
        let edge = enabled && !self.previous;
        self.previous = enabled;
        edge
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Traced(SessionReport),
    /// The operator interrupt ended the session; the loop must stop.
    Interrupted(SessionReport),
}

pub struct Controller {
    parameters: TraceParameters,
    sink: Arc<dyn LogSink>,
    tracer: TracerCommand,
    log_group: String,
    default_command: String,
    poll_interval: Duration,
    preview_lines: usize,
    edge: EdgeDetector,
}

impl Controller {
    pub fn new(
        config: &TracerConfig,
        parameters: TraceParameters,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self::with_tracer(config, parameters, sink, config.tracer_command())
    }

    pub fn with_tracer(
        config: &TracerConfig,
        parameters: TraceParameters,
        sink: Arc<dyn LogSink>,
        tracer: TracerCommand,
    ) -> Self {
        Self {
            parameters,
            sink,
            tracer,
            log_group: config.log_group.clone(),
            default_command: config.default_command.clone(),
            poll_interval: config.poll_interval,
            preview_lines: config.preview_lines,
            edge: EdgeDetector::default(),
        }
    }

    /// Polls until `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!("Monitoring for trace requests");
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let TickOutcome::Interrupted(_) = self.tick(&shutdown).await {
                        info!("Shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One poll iteration.
    pub async fn tick(&mut self, interrupt: &CancellationToken) -> TickOutcome {
        let enabled = self.parameters.is_enabled().await;
        if !self.edge.observe(enabled) {
            debug!(enabled, "No trace request");
            return TickOutcome::Idle;
        }

        let command = self.parameters.target_command(&self.default_command).await;
        info!(%command, "Trace request detected");

        let session = TraceSession::new(
            TraceRequest::new(command),
            LogDelivery::new(Arc::clone(&self.sink), self.log_group.clone()),
            self.preview_lines,
        );
        let report = session
            .run(&self.tracer, &self.parameters, interrupt)
            .await;

        if report.interrupted {
            return TickOutcome::Interrupted(report);
        }

        match self.parameters.disable().await {
            Ok(()) => info!("Auto-disabled toggle"),
            Err(err) => error!(
                "Failed to auto-disable {}: {err}",
                self.parameters.enabled_parameter()
            ),
        }
        TickOutcome::Traced(report)
    }
}
