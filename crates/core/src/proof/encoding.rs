//! Wire format for proofs and public signals.
//!
//! Proofs travel as a tagged JSON structure: decimal coordinate strings
//! for the three Groth16 curve points plus protocol and curve tags, with
//! public signals as a flat array of decimal field elements. Schema and
//! range validation happen here, once, at the boundary; the verification
//! pipeline only ever sees well-formed curve points.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::Field;
use ark_groth16::Proof;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::field::{field_to_string, parse_field_str, FieldError};

/// Protocol tag accepted on the wire.
pub const PROTOCOL: &str = "groth16";
/// Curve tag accepted on the wire.
pub const CURVE: &str = "bn128";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofDecodeError {
    #[error("unsupported protocol: {0:?}")]
    UnsupportedProtocol(String),
    #[error("unsupported curve: {0:?}")]
    UnsupportedCurve(String),
    #[error("bad {point} coordinate: {source}")]
    BadCoordinate {
        point: &'static str,
        source: FieldError,
    },
    #[error("{0} is not an affine point (projective z != 1)")]
    NotNormalized(&'static str),
    #[error("{0} is not on the curve")]
    NotOnCurve(&'static str),
    #[error("{0} is not in the prime-order subgroup")]
    NotInSubgroup(&'static str),
}

/// Groth16 proof in its boundary representation.
///
/// Matches the snarkjs JSON layout: G1 points as `[x, y, "1"]`, the G2
/// point as three `[c0, c1]` pairs with `["1", "0"]` as the projective
/// coordinate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Groth16ProofData {
    pub pi_a: [String; 3],
    pub pi_b: [[String; 2]; 3],
    pub pi_c: [String; 3],
    pub protocol: String,
    pub curve: String,
}

impl Groth16ProofData {
    /// Validate the structure and decode into an arkworks proof.
    pub fn decode(&self) -> Result<Proof<Bn254>, ProofDecodeError> {
        if self.protocol != PROTOCOL {
            return Err(ProofDecodeError::UnsupportedProtocol(self.protocol.clone()));
        }
        if self.curve != CURVE {
            return Err(ProofDecodeError::UnsupportedCurve(self.curve.clone()));
        }

        let a = decode_g1(&self.pi_a, "pi_a")?;
        let b = decode_g2(&self.pi_b, "pi_b")?;
        let c = decode_g1(&self.pi_c, "pi_c")?;

        Ok(Proof { a, b, c })
    }

    /// Encode an arkworks proof for the wire (prover side).
    pub fn encode(proof: &Proof<Bn254>) -> Self {
        Self {
            pi_a: encode_g1(&proof.a),
            pi_b: encode_g2(&proof.b),
            pi_c: encode_g1(&proof.c),
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        }
    }
}

fn parse_fq(s: &str, point: &'static str) -> Result<Fq, ProofDecodeError> {
    parse_field_str(s).map_err(|source| ProofDecodeError::BadCoordinate { point, source })
}

fn decode_g1(coords: &[String; 3], point: &'static str) -> Result<G1Affine, ProofDecodeError> {
    let x = parse_fq(&coords[0], point)?;
    let y = parse_fq(&coords[1], point)?;
    let z = parse_fq(&coords[2], point)?;

    if z != Fq::ONE {
        return Err(ProofDecodeError::NotNormalized(point));
    }

    let p = G1Affine::new_unchecked(x, y);
    if !p.is_on_curve() {
        return Err(ProofDecodeError::NotOnCurve(point));
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProofDecodeError::NotInSubgroup(point));
    }
    Ok(p)
}

fn decode_g2(coords: &[[String; 2]; 3], point: &'static str) -> Result<G2Affine, ProofDecodeError> {
    let x = Fq2::new(
        parse_fq(&coords[0][0], point)?,
        parse_fq(&coords[0][1], point)?,
    );
    let y = Fq2::new(
        parse_fq(&coords[1][0], point)?,
        parse_fq(&coords[1][1], point)?,
    );
    let z = Fq2::new(
        parse_fq(&coords[2][0], point)?,
        parse_fq(&coords[2][1], point)?,
    );

    if z != Fq2::ONE {
        return Err(ProofDecodeError::NotNormalized(point));
    }

    let p = G2Affine::new_unchecked(x, y);
    if !p.is_on_curve() {
        return Err(ProofDecodeError::NotOnCurve(point));
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProofDecodeError::NotInSubgroup(point));
    }
    Ok(p)
}

fn encode_g1(p: &G1Affine) -> [String; 3] {
    // Proof points produced by the prover are never the identity; encode
    // it as the projective zero so decode rejects it cleanly.
    if p.infinity {
        return ["0".to_string(), "1".to_string(), "0".to_string()];
    }
    [field_to_string(&p.x), field_to_string(&p.y), "1".to_string()]
}

fn encode_g2(p: &G2Affine) -> [[String; 2]; 3] {
    if p.infinity {
        return [
            ["0".to_string(), "0".to_string()],
            ["1".to_string(), "0".to_string()],
            ["0".to_string(), "0".to_string()],
        ];
    }
    [
        [field_to_string(&p.x.c0), field_to_string(&p.x.c1)],
        [field_to_string(&p.y.c0), field_to_string(&p.y.c1)],
        ["1".to_string(), "0".to_string()],
    ]
}

/// Parse a public signal array, rejecting any out-of-range entry.
pub fn decode_public_signals(signals: &[String]) -> Result<Vec<Fr>, FieldError> {
    signals.iter().map(|s| parse_field_str(s)).collect()
}

/// Render a public signal array as decimal strings.
pub fn encode_public_signals(signals: &[Fr]) -> Vec<String> {
    signals.iter().map(field_to_string).collect()
}
