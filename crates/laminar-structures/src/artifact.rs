// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Artifact persistence (save/load)
//!
//! Uses `serde` + bincode. Writes go to a temporary file in the destination
//! directory and are renamed into place, so readers never observe a partially
//! written artifact.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{LaminarError, LaminarResult};

/// File extension shared by every persisted artifact
pub const ARTIFACT_EXTENSION: &str = "bin";

/// Serialize `value` to `path`, replacing any existing file atomically.
pub fn write_artifact<T: Serialize>(path: &Path, value: &T) -> LaminarResult<()> {
    let encoded =
        bincode::serialize(value).map_err(|e| LaminarError::persistence(path, e))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&encoded)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| LaminarError::persistence(path, e.error))?;
    Ok(())
}

/// Write `value` only if nothing exists at `path` yet.
///
/// Returns `true` when a file was written.
pub fn write_artifact_once<T: Serialize>(path: &Path, value: &T) -> LaminarResult<bool> {
    if path.exists() {
        tracing::debug!("Keeping existing artifact {}", path.display());
        return Ok(false);
    }
    write_artifact(path, value)?;
    Ok(true)
}

/// Deserialize an artifact previously written by [`write_artifact`].
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> LaminarResult<T> {
    let data = fs::read(path).map_err(|e| LaminarError::configuration(path, e))?;
    bincode::deserialize(&data).map_err(|e| LaminarError::persistence(path, e))
}

/// Like [`read_artifact`] but `Ok(None)` when the file does not exist.
pub fn read_artifact_if_exists<T: DeserializeOwned>(path: &Path) -> LaminarResult<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_artifact(path).map(Some)
}
