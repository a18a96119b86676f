// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-laminar-analysis` to raise one crate to
//! `debug` while the rest stay at the base level.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Crates whose logs are raised to `debug`
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for `--debug-{crate-name}`; `--debug-all` enables every known crate.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }
        flags
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Build an `EnvFilter` directive string
    ///
    /// Crate names are written with underscores since that is how they appear
    /// as tracing targets: `laminar_analysis=debug,info`.
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name.replace('-', "_")))
            .collect();
        filters.push(base_level.to_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and `LAMINAR_DEBUG`
///
/// `LAMINAR_DEBUG` holds comma-separated crate names, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var("LAMINAR_DEBUG") {
        flags.merge_env_value(&env_var);
    }
    flags
}

impl CrateDebugFlags {
    fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enabled_crates.insert(crate_name.to_string());
            }
        }
    }
}

/// Help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  LAMINAR_DEBUG={{crate-name}}[,{{crate-name}}]
  LAMINAR_DEBUG=all
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-laminar-analysis".to_string()]);
        assert!(flags.is_enabled("laminar-analysis"));
        assert!(!flags.is_enabled("laminar-config"));
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_filter_string_uses_targets() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-laminar-analysis".to_string()]);
        assert_eq!(flags.to_filter_string("WARN"), "laminar_analysis=debug,warn");
    }

    #[test]
    fn test_no_flags_is_base_level() {
        let flags = CrateDebugFlags::from_args(Vec::<String>::new());
        assert!(!flags.any_enabled());
        assert_eq!(flags.to_filter_string("info"), "info");
    }

    #[test]
    fn test_env_value_merge() {
        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value("laminar-structures, ,laminar-config");
        assert!(flags.is_enabled("laminar-structures"));
        assert!(flags.is_enabled("laminar-config"));
        assert_eq!(flags.enabled_crates.len(), 2);
    }
}
