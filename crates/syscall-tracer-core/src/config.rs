// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::capture::TracerCommand;
use crate::error::ConfigError;
use std::env;
use std::time::Duration;

const DEFAULT_REGION: &str = "ap-southeast-2";
const DEFAULT_LOG_GROUP: &str = "/syscalls/demo";
const DEFAULT_ENABLED_PARAMETER: &str = "/syscalls/enabled";
const DEFAULT_COMMAND_PARAMETER: &str = "/syscalls/target_command";
const DEFAULT_COMMAND: &str = "ls -la";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_TRACER_PATH: &str = "strace";
const DEFAULT_MAX_STRING_LENGTH: usize = 256;
const DEFAULT_PREVIEW_LINES: usize = 10;

/// Configuration for the trace controller and its collaborators
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// AWS region hosting the parameter store and the log sink
    pub region: String,
    /// Log group that receives one stream per trace session
    pub log_group: String,
    /// Parameter holding the `"true"`/`"false"` toggle
    pub enabled_parameter: String,
    /// Parameter holding the command to trace
    pub command_parameter: String,
    /// Command traced when the command parameter is unset or unreadable
    pub default_command: String,
    /// Delay between two reads of the toggle
    pub poll_interval: Duration,
    /// Path or name of the tracer executable
    pub tracer_path: String,
    /// Maximum printed string length passed to the tracer
    pub max_string_length: usize,
    /// Number of captured lines echoed to the local log per session
    pub preview_lines: usize,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            log_group: DEFAULT_LOG_GROUP.to_string(),
            enabled_parameter: DEFAULT_ENABLED_PARAMETER.to_string(),
            command_parameter: DEFAULT_COMMAND_PARAMETER.to_string(),
            default_command: DEFAULT_COMMAND.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            tracer_path: DEFAULT_TRACER_PATH.to_string(),
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            preview_lines: DEFAULT_PREVIEW_LINES,
            log_level: "info".to_string(),
        }
    }
}

impl TracerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let region = env::var("SYSCALLS_REGION")
            .or_else(|_| env::var("AWS_REGION"))
            .unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let log_group =
            env::var("SYSCALLS_LOG_GROUP").unwrap_or_else(|_| DEFAULT_LOG_GROUP.to_string());
        let enabled_parameter = env::var("SYSCALLS_ENABLED_PARAMETER")
            .unwrap_or_else(|_| DEFAULT_ENABLED_PARAMETER.to_string());
        let command_parameter = env::var("SYSCALLS_COMMAND_PARAMETER")
            .unwrap_or_else(|_| DEFAULT_COMMAND_PARAMETER.to_string());
        let default_command =
            env::var("SYSCALLS_DEFAULT_COMMAND").unwrap_or_else(|_| DEFAULT_COMMAND.to_string());
        let poll_interval_secs = env::var("SYSCALLS_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let tracer_path =
            env::var("SYSCALLS_TRACER_PATH").unwrap_or_else(|_| DEFAULT_TRACER_PATH.to_string());
        let max_string_length = env::var("SYSCALLS_MAX_STRING_LENGTH")
            .ok()
            .and_then(|len| len.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_STRING_LENGTH);
        let preview_lines = env::var("SYSCALLS_PREVIEW_LINES")
            .ok()
            .and_then(|lines| lines.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PREVIEW_LINES);
        let log_level = env::var("SYSCALLS_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            region,
            log_group,
            enabled_parameter,
            command_parameter,
            default_command,
            poll_interval: Duration::from_secs(poll_interval_secs),
            tracer_path,
            max_string_length,
            preview_lines,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        let required = [
            ("SYSCALLS_LOG_GROUP", &self.log_group),
            ("SYSCALLS_ENABLED_PARAMETER", &self.enabled_parameter),
            ("SYSCALLS_COMMAND_PARAMETER", &self.command_parameter),
            ("SYSCALLS_DEFAULT_COMMAND", &self.default_command),
            ("SYSCALLS_TRACER_PATH", &self.tracer_path),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} cannot be empty")));
            }
        }

        if self.max_string_length == 0 {
            return Err(ConfigError::Invalid(
                "Maximum string length must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Tracer invocation with the fixed diagnostic flags
    pub fn tracer_command(&self) -> TracerCommand {
        TracerCommand::strace(&self.tracer_path, self.max_string_length)
    }
}
