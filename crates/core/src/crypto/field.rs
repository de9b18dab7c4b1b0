//! Field element encoding and boundary parsing.
//!
//! All cryptographic values cross API boundaries as decimal strings. The
//! parser here is strict: a value greater than or equal to the field
//! modulus is rejected, never silently reduced. The one deliberate
//! exception is [`FieldEncoder::string_to_field`], whose whole job is to
//! map arbitrary-length identifier strings *into* the field.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use std::sync::Arc;
use thiserror::Error;

use super::poseidon::PoseidonHasher;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("not a decimal field element: {0:?}")]
    NotDecimal(String),
    #[error("field element out of range: {0}")]
    OutOfRange(String),
}

/// Parse a decimal string into a prime field element, rejecting values
/// `>= modulus` instead of reducing them.
///
/// Generic over the field so the same strict path serves both Fr (public
/// signals, roots, secrets) and Fq (proof curve coordinates).
pub fn parse_field_str<F: PrimeField>(s: &str) -> Result<F, FieldError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::NotDecimal(s.to_string()));
    }

    let value: BigUint = s
        .parse()
        .map_err(|_| FieldError::NotDecimal(s.to_string()))?;

    // try_from fails when the value does not fit the limb representation;
    // from_bigint returns None when it fits the limbs but exceeds the
    // modulus. Both are out of range for our purposes.
    let repr = F::BigInt::try_from(value).map_err(|_| FieldError::OutOfRange(s.to_string()))?;
    F::from_bigint(repr).ok_or_else(|| FieldError::OutOfRange(s.to_string()))
}

/// Canonical decimal representation of a field element.
pub fn field_to_string<F: PrimeField>(value: &F) -> String {
    let n: BigUint = value.into_bigint().into();
    n.to_string()
}

/// Deterministic hash-to-field for quote identifiers.
///
/// The commitment issuer and the proof verifier must run this identically;
/// any divergence makes every proof for the affected quote unverifiable.
#[derive(Clone)]
pub struct FieldEncoder {
    hasher: Arc<PoseidonHasher>,
}

impl FieldEncoder {
    pub fn new(hasher: Arc<PoseidonHasher>) -> Self {
        Self { hasher }
    }

    /// Map an identifier string to a field element.
    ///
    /// The UTF-8 bytes are read as a big-endian base-256 integer (reduced
    /// into the field; identifiers longer than 31 bytes necessarily wrap),
    /// then passed through Poseidon `hash1`. No length cap is applied.
    pub fn string_to_field(&self, s: &str) -> Fr {
        let raw = Fr::from_be_bytes_mod_order(s.as_bytes());
        self.hasher.hash1(&raw)
    }
}
