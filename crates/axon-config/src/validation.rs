//! Configuration validation
//!
//! Ensures queue sizes, worker counts and retry delays are usable before a
//! brain is built from the configuration.

use crate::{AxonConfig, ConfigError, ConfigResult, MemoryBackend};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    InvalidRange { low: String, high: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => {
                write!(f, "{} must be greater than zero", field)
            }
            Self::InvalidRange { low, high } => {
                write!(f, "{} must not exceed {}", low, high)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate the complete configuration
///
/// All problems are collected and reported together.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &AxonConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_maintainer(config, &mut errors);
    validate_memory(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_maintainer(config: &AxonConfig, errors: &mut Vec<ConfigValidationError>) {
    let m = &config.maintainer;
    let positive = [
        ("maintainer.worker_num", m.worker_num),
        ("maintainer.run_queue_len", m.run_queue_len),
        ("maintainer.control_queue_len", m.control_queue_len),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ConfigValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }

    if m.retry_base_delay_ms == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "maintainer.retry_base_delay_ms".to_string(),
        });
    }
    if m.retry_base_delay_ms > m.retry_max_delay_ms {
        errors.push(ConfigValidationError::InvalidRange {
            low: "maintainer.retry_base_delay_ms".to_string(),
            high: "maintainer.retry_max_delay_ms".to_string(),
        });
    }
}

fn validate_memory(config: &AxonConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.memory.backend == MemoryBackend::Cache && config.memory.cache_capacity == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "memory.cache_capacity".to_string(),
        });
    }
    if config.memory.backend == MemoryBackend::File && config.memory.file_dir.as_os_str().is_empty()
    {
        errors.push(ConfigValidationError::InvalidValue {
            field: "memory.file_dir".to_string(),
            reason: "file backend needs a directory".to_string(),
        });
    }
}

fn validate_logging(config: &AxonConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
}
