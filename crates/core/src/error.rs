//! Unified error taxonomy for the ticket core.
//!
//! Every failure class callers make decisions on gets its own variant or
//! source enum: validation problems, Merkle accumulator faults (including
//! the fatal capacity exhaustion), field range violations and proof-system
//! failures. Nothing is caught and ignored; verification *rejections*
//! (invalid proof, binding mismatch, stale root) are not errors at all —
//! they travel in `verifier::VerifyOutcome`.

use thiserror::Error;

use crate::crypto::field::FieldError;
use crate::crypto::merkle::MerkleError;
use crate::crypto::poseidon::PoseidonError;
use crate::proof::ProofError;

/// Top-level error type for the ticket core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Merkle accumulator error (capacity exhaustion, bad index, bad state)
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    /// Field element parse/range error
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// Poseidon parameter error
    #[error("poseidon error: {0}")]
    Poseidon(#[from] PoseidonError),

    /// Proof system error (setup, keys, serialization, backend failure)
    #[error("proof error: {0}")]
    Proof(#[from] ProofError),

    /// Invalid request input (bad shape or range), rejected before any
    /// side effect
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal invariant failure (e.g. a poisoned lock)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exhaustion_stays_distinguishable() {
        let err: CoreError = MerkleError::TreeFull(16).into();
        assert!(matches!(err, CoreError::Merkle(MerkleError::TreeFull(16))));
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_field_error_converts() {
        let err: CoreError = FieldError::OutOfRange("123".to_string()).into();
        assert!(matches!(err, CoreError::Field(_)));
    }
}
