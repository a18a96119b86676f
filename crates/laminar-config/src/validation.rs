// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem before failing so a broken file is fixed in one pass.

use crate::{ConfigError, ConfigResult, LaminarConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &LaminarConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &LaminarConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.atlas.name.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "atlas.name".to_string(),
        });
    }
    if config.paths.results_dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "paths.results_dir".to_string(),
        });
    }
}

fn validate_value_ranges(config: &LaminarConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.atlas.n_classes == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "atlas.n_classes".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.analysis.chunk_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "analysis.chunk_size".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let alpha = config.analysis.significance;
    if !(alpha > 0.0 && alpha < 1.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "analysis.significance".to_string(),
            reason: format!("{} is outside (0, 1)", alpha),
        });
    }
    if !LOG_LEVELS.contains(&config.system.log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.system.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = LaminarConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = LaminarConfig::default();
        config.atlas.n_classes = 0;
        config.atlas.name = "  ".to_string();
        config.analysis.significance = 1.5;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("atlas.n_classes"));
        assert!(message.contains("atlas.name"));
        assert!(message.contains("analysis.significance"));
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = LaminarConfig::default();
        config.system.log_level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());

        config.system.log_level = "WARNING".to_string();
        assert!(validate_config(&config).is_err());
    }
}
