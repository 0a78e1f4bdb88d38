// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::log_sink::LogSink;
use crate::parameters::TraceParameters;
use tracing::{info, warn};

/// Creates the log group and seeds both parameters. Safe to run on every start;
/// failures are logged and never abort startup.
pub async fn provision(
    sink: &dyn LogSink,
    parameters: &TraceParameters,
    log_group: &str,
    default_command: &str,
) {
    match sink.ensure_group_exists(log_group).await {
        Ok(()) => info!("Log group ready: {log_group}"),
        Err(err) => warn!("Unable to ensure log group {log_group}: {err}"),
    }

    match parameters.seed_defaults(default_command).await {
        Ok(()) => info!(
            "Parameters ready: {} and {}",
            parameters.enabled_parameter(),
            parameters.command_parameter()
        ),
        Err(err) => warn!("Unable to seed trace parameters: {err}"),
    }
}
