// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory collaborators and stand-in tracers shared by unit tests.

#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capture::TracerCommand;
use crate::error::{ParameterError, SinkError};
use crate::log_sink::{LogSink, SinkEvent};
use crate::parameters::ParameterStore;
use crate::session::StopCondition;

/// Prints every traced word on its own stderr line, then exits.
pub(crate) fn echo_tracer() -> TracerCommand {
    sh_tracer(r#"for word in "$@"; do printf '%s\n' "$word" >&2; done"#)
}

/// Like [`echo_tracer`] but keeps running until signalled.
pub(crate) fn echo_then_sleep_tracer() -> TracerCommand {
    sh_tracer(r#"for word in "$@"; do printf '%s\n' "$word" >&2; done; exec sleep 30"#)
}

fn sh_tracer(script: &str) -> TracerCommand {
    TracerCommand::new(
        "/bin/sh",
        vec!["-c".to_string(), script.to_string(), "tracer".to_string()],
    )
}

#[derive(Default)]
pub(crate) struct MemoryParameterStore {
    values: Mutex<HashMap<String, String>>,
    unavailable: Mutex<HashSet<String>>,
}

impl MemoryParameterStore {
    pub(crate) fn set(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub(crate) fn value(&self, name: &str) -> Option<String> {
        self.values.lock().unwrap().get(name).cloned()
    }

    pub(crate) fn make_unavailable(&self, name: &str) {
        self.unavailable.lock().unwrap().insert(name.to_string());
    }

    fn check(&self, name: &str) -> Result<(), ParameterError> {
        if self.unavailable.lock().unwrap().contains(name) {
            return Err(ParameterError::Unavailable(format!("{name}: connection reset")));
        }
        Ok(())
    }
}

#[async_trait]
impl ParameterStore for MemoryParameterStore {
    async fn get(&self, name: &str) -> Result<Option<String>, ParameterError> {
        self.check(name)?;
        Ok(self.value(name))
    }

    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<(), ParameterError> {
        self.check(name)?;
        let mut values = self.values.lock().unwrap();
        if overwrite || !values.contains_key(name) {
            values.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PutCall {
    pub(crate) stream: String,
    pub(crate) message: String,
    pub(crate) token_in: Option<String>,
    pub(crate) token_out: Option<String>,
}

#[derive(Default)]
struct SinkState {
    groups: HashSet<String>,
    streams: HashMap<String, Vec<String>>,
    expected_tokens: HashMap<String, Option<String>>,
    issued_tokens: usize,
    put_attempts: usize,
    failing_attempts: HashSet<usize>,
    fail_create_stream: bool,
    puts: Vec<PutCall>,
}

/// Log sink that keeps every stream in memory and enforces sequence tokens.
#[derive(Default)]
pub(crate) struct RecordingLogSink {
    state: Mutex<SinkState>,
}

impl RecordingLogSink {
    /// Zero-based put attempts that fail with a service error.
    pub(crate) fn fail_put_attempts(&self, attempts: impl IntoIterator<Item = usize>) {
        self.state
            .lock()
            .unwrap()
            .failing_attempts
            .extend(attempts);
    }

    pub(crate) fn fail_stream_creation(&self) {
        self.state.lock().unwrap().fail_create_stream = true;
    }

    pub(crate) fn puts(&self) -> Vec<PutCall> {
        self.state.lock().unwrap().puts.clone()
    }

    pub(crate) fn streams(&self) -> Vec<String> {
        let mut streams: Vec<String> = self.state.lock().unwrap().streams.keys().cloned().collect();
        streams.sort();
        streams
    }

    pub(crate) fn messages(&self, stream: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn groups(&self) -> Vec<String> {
        self.state.lock().unwrap().groups.iter().cloned().collect()
    }
}

#[async_trait]
impl LogSink for RecordingLogSink {
    async fn ensure_group_exists(&self, group: &str) -> Result<(), SinkError> {
        self.state.lock().unwrap().groups.insert(group.to_string());
        Ok(())
    }

    async fn create_stream(&self, _group: &str, stream: &str) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_stream {
            return Err(SinkError::Service("service unavailable".to_string()));
        }
        if state.streams.contains_key(stream) {
            return Err(SinkError::AlreadyExists(stream.to_string()));
        }
        state.streams.insert(stream.to_string(), Vec::new());
        state.expected_tokens.insert(stream.to_string(), None);
        Ok(())
    }

    async fn put_events(
        &self,
        _group: &str,
        stream: &str,
        events: Vec<SinkEvent>,
        sequence_token: Option<String>,
    ) -> Result<Option<String>, SinkError> {
        let mut state = self.state.lock().unwrap();
        let attempt = state.put_attempts;
        state.put_attempts += 1;
        if state.failing_attempts.contains(&attempt) {
            return Err(SinkError::Service("throttled".to_string()));
        }

        let expected = state
            .expected_tokens
            .get(stream)
            .cloned()
            .ok_or_else(|| SinkError::Service(format!("unknown stream {stream}")))?;
        if expected != sequence_token {
            return Err(SinkError::Service(format!(
                "invalid sequence token {sequence_token:?}, expected {expected:?}"
            )));
        }

        state.issued_tokens += 1;
        let next = Some(format!("token-{}", state.issued_tokens));
        state
            .expected_tokens
            .insert(stream.to_string(), next.clone());

        for event in events {
            state
                .streams
                .entry(stream.to_string())
                .or_default()
                .push(event.message.clone());
            state.puts.push(PutCall {
                stream: stream.to_string(),
                message: event.message,
                token_in: sequence_token.clone(),
                token_out: next.clone(),
            });
        }
        Ok(next)
    }
}

/// Stops once it has been consulted `limit` times.
pub(crate) struct StopAfter {
    calls: AtomicUsize,
    limit: usize,
}

impl StopAfter {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            limit,
        }
    }

    pub(crate) fn never() -> Self {
        Self::new(usize::MAX)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StopCondition for StopAfter {
    async fn should_stop(&self) -> bool {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        calls >= self.limit
    }
}
