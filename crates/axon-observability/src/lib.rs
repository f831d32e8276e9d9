// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # axon-observability
//!
//! Logging infrastructure shared by the axon crates, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: additionally write JSON logs to `<file_dir>/axon.log`

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known axon crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "axon",
    "axon-brain",
    "axon-memory",
    "axon-config",
    "axon-observability",
];
