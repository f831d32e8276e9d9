// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Processors and selectors: the user code a neuron runs
//!
//! A [`Processor`] does the work of one activation. A [`Selector`] picks which
//! cast group receives the signal once the processor succeeded. Both are
//! cloned into every brain built from a blueprint, so state kept in a
//! processor is per brain.

use std::fmt;
use std::sync::Arc;

use crate::blueprint::DEFAULT_CAST_GROUP;
use crate::context::{BrainContext, BrainContextReader};

/// Work done by a neuron on activation
///
/// Never invoked concurrently for the same neuron of the same brain.
pub trait Processor: Send {
    fn process(&mut self, ctx: &BrainContext<'_>) -> anyhow::Result<()>;

    /// Fresh copy for another brain
    fn clone_box(&self) -> Box<dyn Processor>;
}

impl Clone for Box<dyn Processor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

type ProcessFn = dyn Fn(&BrainContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// Processor backed by a closure
#[derive(Clone)]
pub struct FuncProcessor {
    process_fn: Arc<ProcessFn>,
}

impl FuncProcessor {
    pub fn new<F>(process_fn: F) -> Self
    where
        F: Fn(&BrainContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            process_fn: Arc::new(process_fn),
        }
    }
}

impl fmt::Debug for FuncProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FuncProcessor")
    }
}

impl Processor for FuncProcessor {
    fn process(&mut self, ctx: &BrainContext<'_>) -> anyhow::Result<()> {
        (self.process_fn)(ctx)
    }

    fn clone_box(&self) -> Box<dyn Processor> {
        Box::new(self.clone())
    }
}

/// Does nothing and always succeeds. Used for the End neuron.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProcessor;

impl Processor for EmptyProcessor {
    fn process(&mut self, _ctx: &BrainContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Processor> {
        Box::new(*self)
    }
}

/// Chooses the cast group after a successful activation
///
/// Returning a name that is not a cast group of the neuron casts nothing.
pub trait Selector: Send + Sync {
    fn select(&self, ctx: &dyn BrainContextReader) -> String;

    fn clone_box(&self) -> Box<dyn Selector>;
}

impl Clone for Box<dyn Selector> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Always selects the default cast group
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelector;

impl Selector for DefaultSelector {
    fn select(&self, _ctx: &dyn BrainContextReader) -> String {
        DEFAULT_CAST_GROUP.to_string()
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(*self)
    }
}

type SelectFn = dyn Fn(&dyn BrainContextReader) -> String + Send + Sync;

/// Selector backed by a closure
#[derive(Clone)]
pub struct FuncSelector {
    select_fn: Arc<SelectFn>,
}

impl FuncSelector {
    pub fn new<F>(select_fn: F) -> Self
    where
        F: Fn(&dyn BrainContextReader) -> String + Send + Sync + 'static,
    {
        Self {
            select_fn: Arc::new(select_fn),
        }
    }
}

impl fmt::Debug for FuncSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FuncSelector")
    }
}

impl Selector for FuncSelector {
    fn select(&self, ctx: &dyn BrainContextReader) -> String {
        (self.select_fn)(ctx)
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(self.clone())
    }
}
