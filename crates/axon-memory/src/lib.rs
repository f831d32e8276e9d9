// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # axon-memory
//!
//! The key-value memory a brain shares between its neurons. Every running
//! processor of a brain may read and write it at the same time, so stores are
//! `Send + Sync` and take `&self` everywhere.
//!
//! Two stores ship with the crate:
//! - [`CacheMemory`]: bounded in-process map with least-recently-used eviction
//! - [`FileMemory`]: write-through JSON file keeping each value's type

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cache;
pub mod error;
pub mod file;
pub mod value;

pub use cache::CacheMemory;
pub use error::{MemoryError, MemoryResult};
pub use file::FileMemory;
pub use value::MemoryValue;

use axon_config::{MemoryBackend, MemoryConfig};
use std::sync::Arc;

/// Thread-safe key-value store backing a brain's memory
pub trait MemoryStore: Send + Sync {
    fn set(&self, key: &str, value: MemoryValue) -> MemoryResult<()>;

    /// `None` when the key is absent (or was evicted)
    fn get(&self, key: &str) -> Option<MemoryValue>;

    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> MemoryResult<()>;

    fn clear(&self) -> MemoryResult<()>;

    /// Release the store. Later writes fail with [`MemoryError::Closed`].
    fn close(&self) -> MemoryResult<()>;
}

/// Builds the memory store of a brain, given the brain ID.
pub type MemoryFactory = Arc<dyn Fn(&str) -> MemoryResult<Arc<dyn MemoryStore>> + Send + Sync>;

/// Open the store selected by `config` for the brain `brain_id`
pub fn open_store(config: &MemoryConfig, brain_id: &str) -> MemoryResult<Arc<dyn MemoryStore>> {
    let store: Arc<dyn MemoryStore> = match config.backend {
        MemoryBackend::Cache => Arc::new(CacheMemory::new(config.cache_capacity)),
        MemoryBackend::File => Arc::new(FileMemory::open(
            config.file_dir.join(format!("{}.memory.json", brain_id)),
            config.keep_file,
        )?),
    };
    tracing::debug!(brain_id, backend = ?config.backend, "memory store opened");
    Ok(store)
}
