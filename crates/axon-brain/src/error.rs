// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Brain error types.

Construction errors (`NotFound`, `InvalidTopology`) are returned
synchronously and leave the blueprint untouched. Processor and event errors
never reach the caller of `trig_links`; they are logged by the maintainer and
absorbed at the neuron level.
*/

use axon_config::ConfigError;
use axon_memory::MemoryError;
use thiserror::Error;

/// Brain errors
#[derive(Error, Debug)]
pub enum BrainError {
    /// Unknown neuron, link or cast group
    #[error("Not found: {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// Graph change that would break a trigger/cast group rule
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Event kind and action do not belong together
    #[error("Unsupported event: action '{action}' on {kind} event")]
    UnsupportedEvent { kind: String, action: String },

    /// A neuron's processor returned an error (or panicked)
    #[error("Processor of neuron '{neuron_id}' failed: {source}")]
    Processor {
        neuron_id: String,
        source: anyhow::Error,
    },

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The event maintainer could not be started or has stopped
    #[error("Maintainer error: {0}")]
    Maintainer(String),
}

impl BrainError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BrainError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type for brain operations
pub type BrainResult<T> = Result<T, BrainError>;
