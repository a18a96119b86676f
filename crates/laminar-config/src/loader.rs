// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, ExecutionMode, LaminarConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "laminar_configuration.toml";

/// Find the laminar configuration file
///
/// Search order:
/// 1. `LAMINAR_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("LAMINAR_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by LAMINAR_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|path| path.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet LAMINAR_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML.
/// Validation is a separate step, see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<LaminarConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: LaminarConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `LAMINAR_DATA_DIR` -> `paths.data_dir`
/// - `LAMINAR_RESULTS_DIR` -> `paths.results_dir`
/// - `LAMINAR_ATLAS_PATH` -> `paths.atlas_path`
/// - `LAMINAR_ATLAS_NAME` -> `atlas.name`
/// - `LAMINAR_N_CLASSES` -> `atlas.n_classes`
/// - `LAMINAR_LOG_LEVEL` -> `system.log_level`
/// - `LAMINAR_MAX_CORES` -> `system.max_cores`
/// - `LAMINAR_EXECUTION` -> `analysis.execution`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut LaminarConfig) {
    if let Ok(value) = env::var("LAMINAR_DATA_DIR") {
        config.paths.data_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("LAMINAR_RESULTS_DIR") {
        config.paths.results_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("LAMINAR_ATLAS_PATH") {
        config.paths.atlas_path = PathBuf::from(value);
    }
    if let Ok(value) = env::var("LAMINAR_ATLAS_NAME") {
        config.atlas.name = value;
    }
    if let Ok(value) = env::var("LAMINAR_N_CLASSES") {
        if let Ok(n_classes) = value.parse::<usize>() {
            config.atlas.n_classes = n_classes;
        }
    }
    if let Ok(value) = env::var("LAMINAR_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("LAMINAR_MAX_CORES") {
        if let Ok(cores) = value.parse::<usize>() {
            config.system.max_cores = cores;
        }
    }
    if let Ok(value) = env::var("LAMINAR_EXECUTION") {
        if let Ok(mode) = value.parse::<ExecutionMode>() {
            config.analysis.execution = mode;
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"results_dir": "/tmp/out", "n_classes": "5"}`)
pub fn apply_cli_overrides(config: &mut LaminarConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("data_dir") {
        config.paths.data_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("results_dir") {
        config.paths.results_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("atlas_path") {
        config.paths.atlas_path = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("atlas_name") {
        config.atlas.name = value.clone();
    }
    if let Some(value) = cli_args.get("n_classes") {
        if let Ok(n_classes) = value.parse::<usize>() {
            config.atlas.n_classes = n_classes;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("max_cores") {
        if let Ok(cores) = value.parse::<usize>() {
            config.system.max_cores = cores;
        }
    }
    if let Some(value) = cli_args.get("execution") {
        if let Ok(mode) = value.parse::<ExecutionMode>() {
            config.analysis.execution = mode;
        }
    }
}
