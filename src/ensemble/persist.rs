//! On-disk format for trained ensemble state
//!
//! Each ensemble owns a directory named after the ensemble metric. Inside it
//! every artifact is a small JSON document wrapped in a versioned envelope:
//!
//! ```json
//! { "format_version": 1, "kind": "linear", "payload": { ... } }
//! ```
//!
//! Floats are written with `serde_json`'s round-trip formatting, so a model
//! read back predicts bit-identical scores.

use crate::errors::{RelatednessError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current artifact format version
pub const FORMAT_VERSION: u32 = 1;

pub const SIMILARITY_COEFFICIENTS: &str = "similarity_coefficients.json";
pub const MOST_SIMILAR_COEFFICIENTS: &str = "most_similar_coefficients.json";
pub const SIMILARITY_INTERPOLATOR: &str = "similarity_interpolator.json";
pub const MOST_SIMILAR_INTERPOLATOR: &str = "most_similar_interpolator.json";

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    kind: &'a str,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    format_version: u32,
    kind: String,
    payload: T,
}

/// Directory holding the artifacts of the ensemble called `name`
pub fn ensemble_dir(base: &Path, name: &str) -> PathBuf {
    base.join(name)
}

/// Write one artifact, creating `dir` if needed
pub fn write_artifact<T: Serialize>(dir: &Path, file: &str, kind: &str, payload: &T) -> Result<()> {
    fs::create_dir_all(dir)?;
    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        kind,
        payload,
    };
    let json = serde_json::to_string_pretty(&envelope)?;
    let path = dir.join(file);
    fs::write(&path, json)?;
    debug!(path = %path.display(), "wrote ensemble artifact");
    Ok(())
}

/// Read one artifact, checking version and kind
pub fn read_artifact<T: DeserializeOwned>(dir: &Path, file: &str, kind: &str) -> Result<T> {
    let path = dir.join(file);
    let json = fs::read_to_string(&path).map_err(|e| {
        RelatednessError::io(format!("cannot read {}: {e}", path.display()))
    })?;
    let envelope: Envelope<T> = serde_json::from_str(&json)?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(RelatednessError::serialization(format!(
            "{} has format version {}, expected {FORMAT_VERSION}",
            path.display(),
            envelope.format_version
        )));
    }
    if envelope.kind != kind {
        return Err(RelatednessError::serialization(format!(
            "{} holds a '{}' artifact, expected '{kind}'",
            path.display(),
            envelope.kind
        )));
    }
    Ok(envelope.payload)
}

/// Whether an artifact file exists
pub fn artifact_exists(dir: &Path, file: &str) -> bool {
    dir.join(file).is_file()
}
