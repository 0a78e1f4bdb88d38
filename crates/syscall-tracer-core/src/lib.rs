// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Syscall Tracer Core
//!
//! On-demand system-call tracing driven by a remotely toggled flag.
//!
//! ## Overview
//!
//! A single poll loop watches an "enabled" parameter. On a false to true
//! transition it resolves the target command, runs exactly one trace session
//! and clears the flag again. A session spawns the tracer, pulls its
//! diagnostic lines one at a time and appends each of them, in order, to a
//! freshly created log stream.
//!
//! ## Architecture
//!
//! - [`controller`]: poll loop and edge detection
//! - [`session`]: one trace session from stream creation to the completion event
//! - [`capture`]: tracer subprocess lifecycle and line-oriented output
//! - [`delivery`]: ordered, best-effort appends with sequence-token chaining
//! - [`parameters`] / [`log_sink`]: seams to the remote configuration store and log sink
//! - [`provision`]: idempotent startup setup of the log group and parameters

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

/// Tracer subprocess spawning and output capture
pub mod capture;

/// Environment-driven configuration
pub mod config;

/// Poll loop and trace-request edge detection
pub mod controller;

/// Ordered delivery of trace events to a log stream
pub mod delivery;

/// Error types for every collaborator seam
pub mod error;

/// Log line formatting for local diagnostics
pub mod logger;

/// Log sink collaborator (CloudWatch Logs in production)
pub mod log_sink;

/// Configuration store collaborator (SSM Parameter Store in production)
pub mod parameters;

/// One-time idempotent resource setup
pub mod provision;

/// Trace session state machine
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::TracerConfig;
pub use controller::{Controller, EdgeDetector, TickOutcome};
pub use error::{ConfigError, DeliveryError, ParameterError, SinkError, SpawnError};
pub use session::{SessionReport, SessionStatus, TraceRequest, TraceSession};
