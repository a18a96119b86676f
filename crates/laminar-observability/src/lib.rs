// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # laminar-observability
//!
//! Logging setup shared by the laminar binaries and integration tests.
//!
//! Library crates only emit `tracing` events; this crate decides where they go.
//!
//! ## Features
//! - `file-logging`: append events to `<log_dir>/laminar.log` besides the console

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Workspace crates that accept `--debug-<name>` flags
pub const KNOWN_CRATES: &[&str] = &[
    "laminar",
    "laminar-config",
    "laminar-structures",
    "laminar-analysis",
];
