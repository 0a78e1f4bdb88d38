// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ordered delivery of trace events to one log stream.
//!
//! Every append carries the sequence token returned by the previous successful
//! append on the same stream. Failed appends are not retried and leave the token
//! untouched, so the next event is sent with the last token the sink handed out.

use crate::error::DeliveryError;
use crate::log_sink::{LogSink, SinkEvent};
use serde::Serialize;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::debug;

/// Lifecycle milestones of a trace session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Milestone {
    TraceStarted {
        command: String,
        timestamp: String,
    },
    TraceCompleted {
        total_syscalls: u64,
        timestamp: String,
    },
}

/// One captured tracer line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyscallRecord {
    pub timestamp: String,
    pub syscall: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Milestone(Milestone),
    Syscall(SyscallRecord),
    /// Sent verbatim
    Text(String),
}

impl Payload {
    /// Message body sent to the sink: JSON for structured payloads, text as-is.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Milestone(milestone) => serde_json::to_string(milestone),
            Payload::Syscall(record) => serde_json::to_string(record),
            Payload::Text(text) => Ok(text.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: OffsetDateTime,
    pub payload: Payload,
}

impl LogEvent {
    pub fn trace_started(command: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            timestamp: now,
            payload: Payload::Milestone(Milestone::TraceStarted {
                command: command.to_string(),
                timestamp: rfc3339(now),
            }),
        }
    }

    pub fn syscall(line: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            timestamp: now,
            payload: Payload::Syscall(SyscallRecord {
                timestamp: rfc3339(now),
                syscall: line.to_string(),
            }),
        }
    }

    pub fn trace_completed(total_syscalls: u64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            timestamp: now,
            payload: Payload::Milestone(Milestone::TraceCompleted {
                total_syscalls,
                timestamp: rfc3339(now),
            }),
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        i64::try_from(self.timestamp.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

/// Stream name for a session started at `at`: `trace-YYYYMMDD-HHMMSS-mmm`.
pub fn stream_name_at(at: OffsetDateTime) -> String {
    let format = format_description!("[year][month][day]-[hour][minute][second]-[subsecond digits:3]");
    match at.format(&format) {
        Ok(formatted) => format!("trace-{formatted}"),
        Err(_) => format!("trace-{}", at.unix_timestamp()),
    }
}

/// Delivery state of one session: the open stream and its sequence token.
pub struct LogDelivery {
    sink: Arc<dyn LogSink>,
    group: String,
    stream: Option<String>,
    sequence_token: Option<String>,
}

impl LogDelivery {
    pub fn new(sink: Arc<dyn LogSink>, group: impl Into<String>) -> Self {
        Self {
            sink,
            group: group.into(),
            stream: None,
            sequence_token: None,
        }
    }

    /// Creates a new stream named after the current time and makes it the
    /// append target, starting without a sequence token.
    ///
    /// On failure no stream is open and every append fails with
    /// [`DeliveryError::StreamNotOpen`].
    pub async fn open_stream(&mut self) -> Result<String, DeliveryError> {
        self.open_stream_named(stream_name_at(OffsetDateTime::now_utc()))
            .await
    }

    pub async fn open_stream_named(&mut self, name: String) -> Result<String, DeliveryError> {
        self.stream = None;
        self.sequence_token = None;

        self.sink.create_stream(&self.group, &name).await?;
        debug!(group = %self.group, stream = %name, "Opened log stream");
        self.stream = Some(name.clone());
        Ok(name)
    }

    /// Sends exactly one event to the open stream.
    pub async fn append(&mut self, event: &LogEvent) -> Result<(), DeliveryError> {
        let stream = self.stream.as_deref().ok_or(DeliveryError::StreamNotOpen)?;
        let message = event.payload.encode()?;

        let next_token = self
            .sink
            .put_events(
                &self.group,
                stream,
                vec![SinkEvent {
                    timestamp_ms: event.timestamp_ms(),
                    message,
                }],
                self.sequence_token.clone(),
            )
            .await?;
        self.sequence_token = next_token;
        Ok(())
    }

    pub fn stream(&self) -> Option<&str> {
        self.stream.as_deref()
    }

    pub fn sequence_token(&self) -> Option<&str> {
        self.sequence_token.as_deref()
    }
}
