// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory parameter store and log sink

use std::collections::HashMap;
use std::sync::Mutex;

use syscall_tracer_core::log_sink::{LogSink, SinkEvent};
use syscall_tracer_core::parameters::ParameterStore;
use syscall_tracer_core::{ParameterError, SinkError};

/// Parameter store that can flip a value after a number of reads of it
#[derive(Default)]
pub struct MockParameterStore {
    values: Mutex<HashMap<String, String>>,
    reads: Mutex<HashMap<String, usize>>,
    flips: Mutex<HashMap<String, (usize, String)>>,
    writes: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl MockParameterStore {
    pub fn set(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.values.lock().unwrap().get(name).cloned()
    }

    /// After `reads` reads of `name`, its value becomes `value`.
    pub fn flip_after_reads(&self, name: &str, reads: usize, value: &str) {
        self.flips
            .lock()
            .unwrap()
            .insert(name.to_string(), (reads, value.to_string()));
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ParameterStore for MockParameterStore {
    async fn get(&self, name: &str) -> Result<Option<String>, ParameterError> {
        let reads = {
            let mut reads = self.reads.lock().unwrap();
            let count = reads.entry(name.to_string()).or_default();
            *count += 1;
            *count
        };
        if let Some((after, value)) = self.flips.lock().unwrap().get(name).cloned() {
            if reads > after {
                self.set(name, &value);
            }
        }
        Ok(self.value(name))
    }

    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<(), ParameterError> {
        let mut values = self.values.lock().unwrap();
        if overwrite || !values.contains_key(name) {
            values.insert(name.to_string(), value.to_string());
            self.writes
                .lock()
                .unwrap()
                .push((name.to_string(), value.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Append {
    pub stream: String,
    pub message: String,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
}

/// Log sink that issues sequence tokens and rejects mismatched ones
#[derive(Default)]
pub struct MockLogSink {
    streams: Mutex<Vec<String>>,
    expected: Mutex<HashMap<String, Option<String>>>,
    appends: Mutex<Vec<Append>>,
    issued: Mutex<usize>,
}

#[allow(dead_code)]
impl MockLogSink {
    pub fn streams(&self) -> Vec<String> {
        self.streams.lock().unwrap().clone()
    }

    pub fn appends(&self) -> Vec<Append> {
        self.appends.lock().unwrap().clone()
    }

    pub fn events(&self, stream: &str) -> Vec<serde_json::Value> {
        self.appends()
            .into_iter()
            .filter(|append| append.stream == stream)
            .map(|append| serde_json::from_str(&append.message).unwrap())
            .collect()
    }
}

#[async_trait::async_trait]
impl LogSink for MockLogSink {
    async fn ensure_group_exists(&self, _group: &str) -> Result<(), SinkError> {
        Ok(())
    }

    async fn create_stream(&self, _group: &str, stream: &str) -> Result<(), SinkError> {
        let mut streams = self.streams.lock().unwrap();
        if streams.iter().any(|existing| existing == stream) {
            return Err(SinkError::AlreadyExists(stream.to_string()));
        }
        streams.push(stream.to_string());
        self.expected
            .lock()
            .unwrap()
            .insert(stream.to_string(), None);
        Ok(())
    }

    async fn put_events(
        &self,
        _group: &str,
        stream: &str,
        events: Vec<SinkEvent>,
        sequence_token: Option<String>,
    ) -> Result<Option<String>, SinkError> {
        let mut expected = self.expected.lock().unwrap();
        let wanted = expected
            .get(stream)
            .cloned()
            .ok_or_else(|| SinkError::Service(format!("no stream {stream}")))?;
        if wanted != sequence_token {
            return Err(SinkError::Service("InvalidSequenceTokenException".to_string()));
        }

        let next = {
            let mut issued = self.issued.lock().unwrap();
            *issued += 1;
            Some(format!("{:056}", *issued))
        };
        expected.insert(stream.to_string(), next.clone());

        let mut appends = self.appends.lock().unwrap();
        for event in events {
            appends.push(Append {
                stream: stream.to_string(),
                message: event.message,
                token_in: sequence_token.clone(),
                token_out: next.clone(),
            });
        }
        Ok(next)
    }
}
