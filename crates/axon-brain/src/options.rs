// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use axon_config::AxonConfig;
use axon_memory::MemoryFactory;

/// Settings for [`crate::Blueprint::build_with`]
#[derive(Clone, Default)]
pub struct BrainOptions {
    pub config: AxonConfig,
    /// Brain ID; a UUID is generated when unset
    pub id: Option<String>,
    /// Replaces the store selected by `config.memory`
    pub memory_factory: Option<MemoryFactory>,
}

impl BrainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AxonConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_memory_factory(mut self, factory: MemoryFactory) -> Self {
        self.memory_factory = Some(factory);
        self
    }
}

impl fmt::Debug for BrainOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrainOptions")
            .field("config", &self.config)
            .field("id", &self.id)
            .field("memory_factory", &self.memory_factory.is_some())
            .finish()
    }
}
