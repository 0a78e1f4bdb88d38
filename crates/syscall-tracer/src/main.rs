// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use aws_config::{BehaviorVersion, Region};
use syscall_tracer_core::{
    log_sink::CloudWatchLogSink,
    logger::Formatter,
    parameters::{SsmParameterStore, TraceParameters},
    provision::provision,
    Controller, TracerConfig,
};

#[tokio::main]
pub async fn main() {
    let config = TracerConfig::from_env();
    let log_level = config
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    let env_filter = format!("aws_smithy_runtime=warn,aws_config=warn,hyper=off,rustls=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .event_format(Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Error creating config on syscall tracer startup: {e}");
            return;
        }
    };

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    let sink = Arc::new(CloudWatchLogSink::new(aws_sdk_cloudwatchlogs::Client::new(
        &sdk_config,
    )));
    let store = Arc::new(SsmParameterStore::new(aws_sdk_ssm::Client::new(&sdk_config)));
    let parameters = TraceParameters::new(
        store,
        config.enabled_parameter.clone(),
        config.command_parameter.clone(),
    );

    provision(
        sink.as_ref(),
        &parameters,
        &config.log_group,
        &config.default_command,
    )
    .await;

    info!("Log group:         {}", config.log_group);
    info!("Toggle parameter:  {}", config.enabled_parameter);
    info!("Command parameter: {}", config.command_parameter);
    info!("Poll interval:     {}s", config.poll_interval.as_secs());
    info!(
        "Set command:  aws ssm put-parameter --name {} --value 'YOUR_COMMAND' --overwrite",
        config.command_parameter
    );
    info!(
        "Start trace:  aws ssm put-parameter --name {} --value true --overwrite",
        config.enabled_parameter
    );
    info!(
        "Stop trace:   aws ssm put-parameter --name {} --value false --overwrite",
        config.enabled_parameter
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_interrupt(shutdown.clone()));

    let mut controller = Controller::new(&config, parameters, sink);
    controller.run(shutdown).await;
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn wait_for_interrupt(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {e}");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Unable to listen for interrupt: {e}");
                    return;
                }
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Unable to listen for interrupt: {e}");
                    return;
                }
            }
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for interrupt: {e}");
            return;
        }
    }

    info!("Interrupt received, stopping any active trace");
    shutdown.cancel();
}
