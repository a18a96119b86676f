// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Keeps log writers alive; flushes on drop
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory receiving `laminar.log`, when file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Install the global subscriber
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags layered over `base_level`
/// * `base_level` - Level for everything else (usually `system.log_level`)
/// * `log_dir` - With the `file-logging` feature, also append to `<log_dir>/laminar.log`
///
/// # Errors
///
/// Fails if the filter directives are malformed, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    log_dir: Option<PathBuf>,
) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(base_level);
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter directives: {}", filter))?;

    let mut layers = Vec::new();
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter)
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut file_guard = None;

    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        #[cfg(feature = "file-logging")]
        {
            let appender = tracing_appender::rolling::never(dir, "laminar.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_filter(EnvFilter::try_new(&filter)?)
                .boxed();
            layers.push(file_layer);
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir,
    })
}

/// Console-only logging at `info` plus any flags from the environment
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&crate::cli::parse_debug_flags(), "info", None)
}
