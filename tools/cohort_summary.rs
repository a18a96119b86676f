// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cohort summary tool.
//!
//! Loads the atlas and every subject matrix named by the configuration,
//! persists the mean/std matrices and probability maps, and prints a short
//! summary of the cohort.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use laminar::prelude::*;
use laminar::config::{apply_environment_overrides, find_config_file};
use laminar::observability::{debug_flags_help, init_logging, parse_debug_flags};
use laminar::structures::{InMemoryMatrixLoader, SubjectAttributes, SubjectMatrixLoader};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cohort_summary [--config <path>] [--data-dir <path>] [--results-dir <path>] \
         [--atlas <path>] [--execution sequential|parallel]\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> (Option<PathBuf>, HashMap<String, String>) {
    let mut config_path = None;
    let mut overrides = HashMap::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let key = match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config_path = Some(PathBuf::from(v));
                continue;
            }
            "--data-dir" => "data_dir",
            "--results-dir" => "results_dir",
            "--atlas" => "atlas_path",
            "--execution" => "execution",
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => continue,
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        };
        let v = args.next().unwrap_or_else(|| usage_and_exit());
        overrides.insert(key.to_string(), v);
    }

    (config_path, overrides)
}

fn load_configuration(
    config_path: Option<PathBuf>,
    overrides: &HashMap<String, String>,
) -> Result<LaminarConfig> {
    let config_path = config_path.or_else(|| find_config_file().ok());
    let config = match config_path {
        Some(path) => load_config(Some(&path), Some(overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let mut config = LaminarConfig::default();
            apply_environment_overrides(&mut config);
            laminar::config::apply_cli_overrides(&mut config, overrides);
            config
        }
    };
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let (config_path, overrides) = parse_args();
    let config = load_configuration(config_path, &overrides)?;
    let _logging = init_logging(&parse_debug_flags(), &config.system.log_level, None)?;

    let atlas = BrainAtlas::from_loader(&BincodeAtlasLoader::new(
        config.atlas.name.clone(),
        config.paths.atlas_path.clone(),
    ))?;
    let layout = MatrixLayout::for_atlas(&atlas, config.atlas.n_classes);

    let matrices = MatrixDirectoryLoader::new(config.paths.data_dir.clone()).load_matrices()?;
    let mut registry = SubjectRegistry::new();
    for (id, _) in &matrices {
        registry.insert(Subject::new(id.clone(), SubjectAttributes::default()));
    }
    registry.attach_matrices(&InMemoryMatrixLoader(matrices), layout)?;
    if registry.is_empty() {
        anyhow::bail!("No subject matrices found in {}", config.paths.data_dir.display());
    }

    tracing::info!("Summarising {} subjects", registry.len());
    let access = ResultsAccess::new(config, atlas, registry)?;
    let aggregator = access.aggregator();
    aggregator.save_summary()?;
    access.get_results_set("mean")?;
    access.get_results_set("std")?;

    let mean = aggregator.mean()?;
    let (n_regions, n_classes) = mean.shape();
    println!("Atlas:     {} {:?}", access.atlas().name(), access.atlas().shape());
    println!("Subjects:  {}", aggregator.len());
    println!("Matrix:    {} regions x {} classes", n_regions, n_classes);
    for (class_idx, column) in mean.data().columns().into_iter().enumerate() {
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!("Class {}:   mean probability {:.3} .. {:.3}", class_idx, min, max);
    }
    println!("Results:   {}", aggregator.results_dir().display());
    Ok(())
}
