//! Poseidon round constants and MDS matrices for the BN254 scalar field.
//!
//! Constants are derived deterministically per state width so that the
//! native hasher and the R1CS gadgets always agree bit-for-bit: both sides
//! load their parameters from this module and nowhere else. Any edit here
//! must re-run the fixed-vector compatibility tests in `crypto::poseidon`
//! and `proof::gadgets::poseidon`.
//!
//! Parameters:
//! - Field: BN254 scalar field (Fr)
//! - Widths: t = 2 (hash1), t = 3 (hash2), t = 4 (hash3)
//! - Full rounds: RF = 8 (4 at start, 4 at end)
//! - Partial rounds: RP = 56 / 57 / 56 for t = 2 / 3 / 4
//! - S-box: x^5

use ark_bn254::Fr;
use ark_ff::{Field, PrimeField};

/// Number of full rounds (RF = 8), shared by all widths.
pub const FULL_ROUNDS: usize = 8;

/// Supported state widths (t = inputs + 1 capacity element).
pub const SUPPORTED_WIDTHS: [usize; 3] = [2, 3, 4];

/// Partial round count for a supported width, `None` otherwise.
pub fn partial_rounds(width: usize) -> Option<usize> {
    match width {
        2 => Some(56),
        3 => Some(57),
        4 => Some(56),
        _ => None,
    }
}

/// Total number of round constants for a supported width.
pub fn num_constants(width: usize) -> Option<usize> {
    partial_rounds(width).map(|rp| width * (FULL_ROUNDS + rp))
}

/// Generate round constants deterministically for the given width.
///
/// Uses a hash-based derivation in the spirit of the Grain LFSR procedure
/// from the Poseidon specification, with a width-tagged domain separator.
/// Returns an empty vector for unsupported widths; callers validate the
/// width before asking for constants.
pub fn round_constants(width: usize) -> Vec<Fr> {
    let count = num_constants(width).unwrap_or(0);
    let mut constants = Vec::with_capacity(count);

    let domain = format!("Poseidon_BN254_t{}_RF{}", width, FULL_ROUNDS);

    for i in 0..count {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(&(i as u64).to_le_bytes());
        hasher.update(b"round_constant");

        let hash = hasher.finalize();
        let constant = Fr::from_le_bytes_mod_order(hash.as_bytes());
        constants.push(constant);
    }

    constants
}

/// Generate the MDS matrix for the given width.
///
/// Uses a Cauchy matrix construction, which is MDS over a prime field when
/// all `x[i] + y[j]` are distinct and non-zero.
pub fn mds_matrix(width: usize) -> Vec<Vec<Fr>> {
    let mut matrix = vec![vec![Fr::from(0u64); width]; width];

    // x = [0, 1, ...], y = [width, width + 1, ...]
    let x: Vec<Fr> = (0..width).map(|i| Fr::from(i as u64)).collect();
    let y: Vec<Fr> = (width..(2 * width)).map(|i| Fr::from(i as u64)).collect();

    for i in 0..width {
        for j in 0..width {
            // M[i][j] = 1 / (x[i] + y[j]); the sum is a small positive
            // integer (at most 3 * width - 2), never zero in Fr, so the
            // inverse always exists.
            let sum = x[i] + y[j];
            matrix[i][j] = sum.inverse().unwrap_or_else(|| unreachable!());
        }
    }

    matrix
}
