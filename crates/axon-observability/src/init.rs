// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for axon
//!
//! Installs a global `tracing` subscriber with a console layer (text or JSON)
//! and, with the `file-logging` feature, a JSON file layer.

use anyhow::{Context, Result};
use axon_config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps background log writers alive; logs are flushed when dropped.
#[derive(Default)]
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize logging from configuration and debug flags
///
/// The filter is the configured level for everything, raised to `debug` for
/// each crate named in `debug_flags`. `RUST_LOG`, when set, replaces the
/// computed filter entirely.
///
/// # Errors
///
/// Fails if the filter does not parse, the log directory cannot be created,
/// or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => directives,
        _ => debug_flags.to_filter_string(&config.level),
    };
    let new_filter = || {
        EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(new_filter()?)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(new_filter()?)
            .boxed(),
    };
    layers.push(console_layer);

    #[allow(unused_mut)]
    let mut guard = LoggingGuard::default();

    #[cfg(feature = "file-logging")]
    if let Some(dir) = &config.file_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let file_appender = tracing_appender::rolling::never(dir, "axon.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard._file_guard = Some(file_guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(new_filter()?)
            .boxed();
        layers.push(file_layer);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}

/// Like [`init_logging`], but an already-installed subscriber is not an error.
///
/// Useful in tests, where many cases race to set up logging.
pub fn try_init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Option<LoggingGuard> {
    init_logging(config, debug_flags).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_tolerated() {
        let config = LoggingConfig::default();
        let flags = CrateDebugFlags::default();

        let _first = try_init_logging(&config, &flags);
        // Whatever happened above, the global subscriber now exists
        assert!(init_logging(&config, &flags).is_err());
        assert!(try_init_logging(&config, &flags).is_none());
    }
}
