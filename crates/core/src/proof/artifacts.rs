//! Circuit artifact persistence.
//!
//! Keys are stored as compressed arkworks serializations on disk. The
//! verifying key must exist before the verifier can be constructed; its
//! absence is a startup failure, never a per-request error.

use std::fs;
use std::path::Path;

use tracing::info;

use super::{ProofError, TicketProver, TicketVerifyingKey};

/// Load the verifying key, or fail with a distinct fatal error if the
/// artifact is missing.
pub fn load_verifying_key(path: &Path) -> Result<TicketVerifyingKey, ProofError> {
    if !path.exists() {
        return Err(ProofError::VerifyingKeyMissing(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let vk = TicketVerifyingKey::from_bytes(&bytes)?;

    info!(
        path = %path.display(),
        fingerprint = %fingerprint(&bytes),
        "loaded verifying key"
    );
    Ok(vk)
}

pub fn save_verifying_key(path: &Path, vk: &TicketVerifyingKey) -> Result<(), ProofError> {
    let bytes = vk.to_bytes()?;
    write_artifact(path, &bytes)?;
    info!(
        path = %path.display(),
        fingerprint = %fingerprint(&bytes),
        "wrote verifying key"
    );
    Ok(())
}

pub fn load_proving_key(path: &Path) -> Result<TicketProver, ProofError> {
    let bytes = fs::read(path)?;
    TicketProver::from_bytes(&bytes)
}

pub fn save_proving_key(path: &Path, prover: &TicketProver) -> Result<(), ProofError> {
    let bytes = prover.to_bytes()?;
    write_artifact(path, &bytes)
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), ProofError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Short blake3 digest used to correlate key files across deployments.
fn fingerprint(bytes: &[u8]) -> String {
    let digest = blake3::hash(bytes);
    hex::encode(&digest.as_bytes()[..8])
}
