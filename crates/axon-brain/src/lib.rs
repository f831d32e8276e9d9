// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # axon-brain
//!
//! Graph activation engine. A [`Blueprint`] describes neurons (units of work)
//! joined by directed links; [`Blueprint::build`] turns it into a [`Brain`]
//! that runs neurons concurrently as signals reach them.
//!
//! ## Activation
//! - A neuron activates when every link of at least one of its **trigger
//!   groups** is Ready. Trigger groups are never subsets of one another.
//! - When its processor succeeds, the neuron's selector names one **cast
//!   group**; only that group's out-links become Ready.
//! - Reaching the End neuron puts the brain to sleep; so does running out of
//!   work.
//!
//! ## Example
//! ```rust,no_run
//! use axon_brain::{Blueprint, BrainContext};
//!
//! # fn main() -> axon_brain::BrainResult<()> {
//! let mut bp = Blueprint::new();
//! let greet = bp.add_neuron(|ctx: &BrainContext<'_>| {
//!     ctx.set_memory("greeting", "hello")?;
//!     Ok(())
//! });
//! bp.add_entry_link_to(&greet)?;
//! bp.add_end_link_from(&greet)?;
//!
//! let brain = bp.build()?;
//! brain.entry()?;
//! brain.wait();
//! assert_eq!(brain.get_memory("greeting").unwrap().as_str(), Some("hello"));
//! # Ok(())
//! # }
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod activation;
pub mod blueprint;
pub mod brain;
pub mod context;
pub mod error;
mod event;
mod maintainer;
pub mod options;
pub mod processor;
mod rate_limiter;
pub mod records;

pub use blueprint::{
    Blueprint, Labels, LinkOptions, LinkSpec, NeuronOptions, NeuronSpec, DEFAULT_CAST_GROUP,
    END_NEURON_ID, ENTRY_SIGNAL,
};
pub use brain::Brain;
pub use context::{BrainContext, BrainContextReader};
pub use error::{BrainError, BrainResult};
pub use options::BrainOptions;
pub use processor::{DefaultSelector, EmptyProcessor, FuncProcessor, FuncSelector, Processor, Selector};
pub use records::{
    BrainState, Counters, LinkState, LinkStatus, NeuronState, NeuronStatus, StateCounts,
};
