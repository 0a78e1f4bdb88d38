// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::SinkError;
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use aws_sdk_cloudwatchlogs::Client;
use tracing::debug;

/// A single event as accepted by the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEvent {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub message: String,
}

/// Append-only named streams grouped under a log group.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Creates `group` unless it already exists.
    async fn ensure_group_exists(&self, group: &str) -> Result<(), SinkError>;

    /// Creates a new stream. A name that is already taken is [`SinkError::AlreadyExists`].
    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), SinkError>;

    /// Appends `events` in order and returns the token expected by the next append.
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<SinkEvent>,
        sequence_token: Option<String>,
    ) -> Result<Option<String>, SinkError>;
}

/// CloudWatch Logs backed sink
#[derive(Debug, Clone)]
pub struct CloudWatchLogSink {
    client: Client,
}

impl CloudWatchLogSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSink for CloudWatchLogSink {
    async fn ensure_group_exists(&self, group: &str) -> Result<(), SinkError> {
        match self
            .client
            .create_log_group()
            .log_group_name(group)
            .send()
            .await
        {
            Ok(_) => {
                debug!(group, "Created log group");
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_already_exists_exception()) =>
            {
                debug!(group, "Log group already exists");
                Ok(())
            }
            Err(err) => Err(SinkError::Service(
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), SinkError> {
        match self
            .client
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_already_exists_exception()) =>
            {
                Err(SinkError::AlreadyExists(format!("{group}/{stream}")))
            }
            Err(err) => Err(SinkError::Service(
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<SinkEvent>,
        sequence_token: Option<String>,
    ) -> Result<Option<String>, SinkError> {
        let log_events = events
            .into_iter()
            .map(|event| {
                InputLogEvent::builder()
                    .timestamp(event.timestamp_ms)
                    .message(event.message)
                    .build()
                    .map_err(|err| SinkError::Service(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_log_events(Some(log_events))
            .set_sequence_token(sequence_token)
            .send()
            .await
            .map_err(|err| SinkError::Service(DisplayErrorContext(&err).to_string()))?;

        Ok(output.next_sequence_token().map(str::to_owned))
    }
}
