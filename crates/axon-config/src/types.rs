// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `axon.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AxonConfig {
    pub maintainer: MaintainerConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

/// Event maintainer configuration (queues, worker pool, retry policy)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintainerConfig {
    /// Number of neuron workers running processors in parallel
    pub worker_num: usize,
    /// Capacity of the neuron-run queue feeding the workers
    pub run_queue_len: usize,
    /// Capacity of the control (link/neuron/brain event) queue
    pub control_queue_len: usize,
    /// Base delay of the continue-cast retry backoff
    pub retry_base_delay_ms: u64,
    /// Upper bound of the continue-cast retry backoff
    pub retry_max_delay_ms: u64,
    /// Retries of one continue-cast before giving up
    pub max_cast_retries: u32,
    /// Tear the maintainer down and release memory every time the brain sleeps
    pub shutdown_on_sleep: bool,
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self {
            worker_num: 4,
            run_queue_len: 10,
            control_queue_len: 10,
            retry_base_delay_ms: 5,
            retry_max_delay_ms: 1000,
            max_cast_retries: 10,
            shutdown_on_sleep: false,
        }
    }
}

impl MaintainerConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

/// Which built-in memory store backs a brain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    /// Bounded in-process cache
    Cache,
    /// Durable JSON file, one per brain
    File,
}

/// Brain memory configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub backend: MemoryBackend,
    /// Maximum number of entries kept by the cache backend
    pub cache_capacity: usize,
    /// Directory holding `<brain-id>.memory.json` for the file backend
    pub file_dir: PathBuf,
    /// Keep the memory file when the brain shuts down
    pub keep_file: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::Cache,
            cache_capacity: 1 << 20,
            file_dir: PathBuf::from("."),
            keep_file: false,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Directory for log files (only used with the `file-logging` feature)
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file_dir: None,
        }
    }
}
