//! # Axon - graph activation engine
//!
//! Axon runs a directed graph of units of work ("neurons") joined by
//! signal-carrying links. A neuron fires once every link of one of its
//! trigger groups carries a signal; when it finishes, a selector picks which
//! of its cast groups passes the signal on. Independent neurons run in
//! parallel on a worker pool while a single control thread owns all state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axon::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut bp = Blueprint::new();
//! let first = bp.add_neuron(|ctx: &BrainContext<'_>| {
//!     ctx.set_memory("first", "Clay")?;
//!     Ok(())
//! });
//! let full = bp.add_neuron(|ctx: &BrainContext<'_>| {
//!     let first = ctx.get_memory("first").and_then(|v| v.as_str().map(str::to_string));
//!     ctx.set_memory("full", format!("{} Zhang", first.unwrap_or_default()))?;
//!     Ok(())
//! });
//! bp.add_entry_link_to(&first)?;
//! bp.add_link(&first, &full)?;
//! bp.add_end_link_from(&full)?;
//!
//! let brain = bp.build()?;
//! brain.entry()?;
//! brain.wait();
//! println!("{:?}", brain.get_memory("full"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: axon-config, axon-observability            │
//! │  (TOML config + overrides, tracing setup)               │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Collaborators: axon-memory                             │
//! │  (MemoryStore trait, cache and file stores)             │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine: axon-brain                                     │
//! │  (Blueprint, activation, maintainer, Brain)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - **`file-logging`**: also write JSON logs to a file (tracing-appender)
//!
//! ## License
//!
//! Apache-2.0

// Re-export the engine
pub use axon_brain as brain;

// Re-export collaborators and foundation
pub use axon_config as config;
pub use axon_memory as memory;
pub use axon_observability as observability;

/// Everything needed to build and run a brain
pub mod prelude {
    pub use crate::brain::{
        Blueprint, Brain, BrainContext, BrainContextReader, BrainError, BrainOptions, BrainResult,
        BrainState, EmptyProcessor, FuncProcessor, FuncSelector, Labels, LinkOptions, LinkState,
        NeuronOptions, NeuronState, Processor, Selector, DEFAULT_CAST_GROUP,
    };
    pub use crate::config::AxonConfig;
    pub use crate::memory::{MemoryStore, MemoryValue};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
