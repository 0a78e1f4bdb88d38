// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ParameterError;
use crate::session::StopCondition;
use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client;
use std::sync::Arc;
use tracing::{debug, warn};

/// String-typed key/value parameters shared with operators.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Current value of `name`, `None` when it does not exist.
    async fn get(&self, name: &str) -> Result<Option<String>, ParameterError>;

    /// Writes `value`. Without `overwrite` an existing value is left untouched and
    /// the call still succeeds.
    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<(), ParameterError>;
}

/// SSM Parameter Store backed parameters
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get(&self, name: &str) -> Result<Option<String>, ParameterError> {
        match self.client.get_parameter().name(name).send().await {
            Ok(output) => Ok(output
                .parameter()
                .and_then(|parameter| parameter.value())
                .map(str::to_owned)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found()) =>
            {
                Ok(None)
            }
            Err(err) => Err(ParameterError::Unavailable(
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<(), ParameterError> {
        let mut request = self
            .client
            .put_parameter()
            .name(name)
            .value(value)
            .overwrite(overwrite);
        if !overwrite {
            request = request.r#type(ParameterType::String);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if !overwrite
                    && err
                        .as_service_error()
                        .is_some_and(|e| e.is_parameter_already_exists()) =>
            {
                debug!(name, "Parameter already exists, keeping current value");
                Ok(())
            }
            Err(err) => Err(ParameterError::Unavailable(
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }
}

/// The two parameters driving the controller: the toggle and the target command.
///
/// Reads never fail: an unreadable toggle is disabled and an unreadable command
/// resolves to the caller's default.
#[derive(Clone)]
pub struct TraceParameters {
    store: Arc<dyn ParameterStore>,
    enabled_parameter: String,
    command_parameter: String,
}

impl TraceParameters {
    pub fn new(
        store: Arc<dyn ParameterStore>,
        enabled_parameter: impl Into<String>,
        command_parameter: impl Into<String>,
    ) -> Self {
        Self {
            store,
            enabled_parameter: enabled_parameter.into(),
            command_parameter: command_parameter.into(),
        }
    }

    pub fn enabled_parameter(&self) -> &str {
        &self.enabled_parameter
    }

    pub fn command_parameter(&self) -> &str {
        &self.command_parameter
    }

    pub async fn is_enabled(&self) -> bool {
        match self.store.get(&self.enabled_parameter).await {
            Ok(Some(value)) => value.trim().eq_ignore_ascii_case("true"),
            Ok(None) => false,
            Err(err) => {
                warn!("Unable to read {}, treating as disabled: {err}", self.enabled_parameter);
                false
            }
        }
    }

    pub async fn target_command(&self, default_command: &str) -> String {
        match self.store.get(&self.command_parameter).await {
            Ok(Some(command)) if !command.trim().is_empty() => command,
            Ok(_) => {
                debug!("{} is unset, using default command", self.command_parameter);
                default_command.to_string()
            }
            Err(err) => {
                warn!(
                    "Unable to read {}, using default command: {err}",
                    self.command_parameter
                );
                default_command.to_string()
            }
        }
    }

    /// Writes the toggle back to `"false"`.
    pub async fn disable(&self) -> Result<(), ParameterError> {
        self.store.put(&self.enabled_parameter, "false", true).await
    }

    /// Creates both parameters with their initial values, leaving existing ones alone.
    ///
    /// Each parameter is attempted even if the other fails; the first error is returned.
    pub async fn seed_defaults(&self, default_command: &str) -> Result<(), ParameterError> {
        let enabled = self.store.put(&self.enabled_parameter, "false", false).await;
        let command = self
            .store
            .put(&self.command_parameter, default_command, false)
            .await;
        enabled.and(command)
    }
}

/// A session stops as soon as the toggle reads anything but `"true"`.
#[async_trait]
impl StopCondition for TraceParameters {
    async fn should_stop(&self) -> bool {
        !self.is_enabled().await
    }
}
