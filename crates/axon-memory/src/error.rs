// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Memory store errors
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Memory store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Memory serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Memory store is closed")]
    Closed,
}

pub type MemoryResult<T> = Result<T, MemoryError>;
