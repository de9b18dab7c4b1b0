//! Core configuration.
//!
//! Loaded once at process startup; everything here is static for the
//! lifetime of the accumulator instance.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::crypto::merkle::TREE_DEPTH;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// Merkle tree depth; bounds capacity at 2^depth commitments. Must
    /// match the depth the circuit artifacts were built for.
    pub tree_depth: usize,

    /// How many recent roots the verifier accepts. 1 = strict: only the
    /// current root verifies, and any proof raced by a later payment must
    /// be regenerated against a fresh root.
    pub root_window: usize,

    /// Verifying key artifact; missing at startup is fatal.
    pub verifying_key_path: PathBuf,

    /// Optional proving key, only needed by dev/test tooling that proves
    /// in-process.
    pub proving_key_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tree_depth: TREE_DEPTH,
            root_window: 1,
            verifying_key_path: PathBuf::from("artifacts/ticket_vk.bin"),
            proving_key_path: None,
        }
    }
}

impl CoreConfig {
    /// Load configuration from a JSON file; absent keys fall back to
    /// defaults.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            CoreError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }
}
