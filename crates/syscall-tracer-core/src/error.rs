// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while building the tracer configuration at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failure to read or write a remote parameter.
///
/// A parameter that simply does not exist is not an error; stores report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("Parameter store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that prevent the tracer subprocess from starting
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("Trace command is empty")]
    EmptyCommand,

    #[error("Unable to parse trace command: {0}")]
    InvalidCommand(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by the log sink collaborator
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Log resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Log sink request failed: {0}")]
    Service(String),
}

/// Errors surfaced by a single append. None of them halt a session.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("No log stream is open")]
    StreamNotOpen,

    #[error("Failed to encode log event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
