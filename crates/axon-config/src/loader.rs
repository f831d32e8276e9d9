// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{AxonConfig, ConfigError, ConfigResult, LogFormat, MemoryBackend};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "axon.toml";

/// Find the axon configuration file
///
/// Search order:
/// 1. `AXON_CONFIG_PATH` environment variable
/// 2. Current working directory: `./axon.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("AXON_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by AXON_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd;
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet AXON_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML.
/// Validation is left to [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<AxonConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: AxonConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

fn parse_backend(value: &str) -> Option<MemoryBackend> {
    match value.to_lowercase().as_str() {
        "cache" => Some(MemoryBackend::Cache),
        "file" => Some(MemoryBackend::File),
        _ => None,
    }
}

fn parse_format(value: &str) -> Option<LogFormat> {
    match value.to_lowercase().as_str() {
        "text" => Some(LogFormat::Text),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `AXON_WORKER_NUM` -> `maintainer.worker_num`
/// - `AXON_RUN_QUEUE_LEN` -> `maintainer.run_queue_len`
/// - `AXON_CONTROL_QUEUE_LEN` -> `maintainer.control_queue_len`
/// - `AXON_MAX_CAST_RETRIES` -> `maintainer.max_cast_retries`
/// - `AXON_SHUTDOWN_ON_SLEEP` -> `maintainer.shutdown_on_sleep`
/// - `AXON_MEMORY_BACKEND` -> `memory.backend`
/// - `AXON_MEMORY_DIR` -> `memory.file_dir`
/// - `AXON_LOG_LEVEL` -> `logging.level`
/// - `AXON_LOG_FORMAT` -> `logging.format`
pub fn apply_environment_overrides(config: &mut AxonConfig) {
    let vars: HashMap<String, String> = env::vars()
        .filter(|(key, _)| key.starts_with("AXON_"))
        .collect();
    apply_overrides(config, &vars, "AXON_", true);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"worker_num": "8", "log_level": "debug"}`)
pub fn apply_cli_overrides(config: &mut AxonConfig, cli_args: &HashMap<String, String>) {
    apply_overrides(config, cli_args, "", false);
}

fn apply_overrides(
    config: &mut AxonConfig,
    values: &HashMap<String, String>,
    prefix: &str,
    upper: bool,
) {
    let get = |name: &str| {
        let key = if upper {
            format!("{}{}", prefix, name.to_uppercase())
        } else {
            format!("{}{}", prefix, name)
        };
        values.get(&key)
    };

    if let Some(workers) = get("worker_num").and_then(|v| v.parse::<usize>().ok()) {
        config.maintainer.worker_num = workers;
    }
    if let Some(len) = get("run_queue_len").and_then(|v| v.parse::<usize>().ok()) {
        config.maintainer.run_queue_len = len;
    }
    if let Some(len) = get("control_queue_len").and_then(|v| v.parse::<usize>().ok()) {
        config.maintainer.control_queue_len = len;
    }
    if let Some(retries) = get("max_cast_retries").and_then(|v| v.parse::<u32>().ok()) {
        config.maintainer.max_cast_retries = retries;
    }
    if let Some(value) = get("shutdown_on_sleep") {
        config.maintainer.shutdown_on_sleep = parse_bool(value);
    }
    if let Some(backend) = get("memory_backend").and_then(|v| parse_backend(v)) {
        config.memory.backend = backend;
    }
    if let Some(dir) = get("memory_dir") {
        config.memory.file_dir = PathBuf::from(dir);
    }
    if let Some(level) = get("log_level") {
        config.logging.level = level.clone();
    }
    if let Some(format) = get("log_format").and_then(|v| parse_format(v)) {
        config.logging.format = format;
    }
}
