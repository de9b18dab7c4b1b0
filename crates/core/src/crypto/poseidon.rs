//! Native Poseidon hash over the BN254 scalar field.
//!
//! One [`PoseidonHasher`] instance is constructed at startup and shared by
//! the field encoder, the Merkle accumulator and the commitment issuer, so
//! every component hashes with exactly the same permutation parameters.
//! The in-circuit gadgets (`proof::gadgets::poseidon`) load the same
//! constants module; the compatibility tests there pin both sides to the
//! fixed vectors below.
//!
//! Three fixed call shapes are exposed, one per state width:
//! - `hash1(a)` (t = 2): field encoding of quote identifiers
//! - `hash2(a, b)` (t = 3): Merkle node compression
//! - `hash3(a, b, c)` (t = 4): leaf commitments

use ark_bn254::Fr;
use ark_ff::Field;
use thiserror::Error;

use super::poseidon_constants;

#[derive(Error, Debug)]
pub enum PoseidonError {
    #[error("unsupported Poseidon width: {0}")]
    UnsupportedWidth(usize),
}

/// Poseidon permutation parameters for a single state width.
pub struct PoseidonParams {
    /// Width of the state (t)
    pub width: usize,
    /// Number of full rounds
    pub full_rounds: usize,
    /// Number of partial rounds
    pub partial_rounds: usize,
    /// Round constants, `width * (full_rounds + partial_rounds)` entries
    pub round_constants: Vec<Fr>,
    /// MDS matrix, `width x width`
    pub mds_matrix: Vec<Vec<Fr>>,
}

impl PoseidonParams {
    /// Load the standard parameters for a supported width.
    pub fn new(width: usize) -> Result<Self, PoseidonError> {
        let partial_rounds = poseidon_constants::partial_rounds(width)
            .ok_or(PoseidonError::UnsupportedWidth(width))?;

        Ok(Self {
            width,
            full_rounds: poseidon_constants::FULL_ROUNDS,
            partial_rounds,
            round_constants: poseidon_constants::round_constants(width),
            mds_matrix: poseidon_constants::mds_matrix(width),
        })
    }

    /// Apply the Poseidon permutation to a state of `self.width` elements.
    fn permute(&self, state: &mut [Fr]) {
        let t = self.width;
        let rf = self.full_rounds;
        let rp = self.partial_rounds;

        let mut round_ctr = 0;

        // First half of full rounds
        for _ in 0..(rf / 2) {
            self.full_round(state, round_ctr);
            round_ctr += t;
        }

        // Partial rounds
        for _ in 0..rp {
            self.partial_round(state, round_ctr);
            round_ctr += t;
        }

        // Second half of full rounds
        for _ in 0..(rf / 2) {
            self.full_round(state, round_ctr);
            round_ctr += t;
        }
    }

    /// Full round: S-box on all elements, then MDS
    fn full_round(&self, state: &mut [Fr], round_ctr: usize) {
        for (i, elem) in state.iter_mut().enumerate() {
            *elem += self.round_constants[round_ctr + i];
            *elem = sbox(*elem);
        }
        self.mds_multiply(state);
    }

    /// Partial round: S-box on first element only, then MDS
    fn partial_round(&self, state: &mut [Fr], round_ctr: usize) {
        for (i, elem) in state.iter_mut().enumerate() {
            *elem += self.round_constants[round_ctr + i];
        }
        state[0] = sbox(state[0]);
        self.mds_multiply(state);
    }

    /// Multiply state by the MDS matrix
    fn mds_multiply(&self, state: &mut [Fr]) {
        let mut new_state = vec![Fr::from(0u64); self.width];

        for (i, out) in new_state.iter_mut().enumerate() {
            for j in 0..self.width {
                *out += self.mds_matrix[i][j] * state[j];
            }
        }

        state.copy_from_slice(&new_state);
    }

    /// Hash `width - 1` inputs: state `[0, inputs...]`, permute, take
    /// the first element.
    fn hash(&self, inputs: &[Fr]) -> Fr {
        debug_assert_eq!(inputs.len(), self.width - 1);

        let mut state = vec![Fr::from(0u64); self.width];
        state[1..].copy_from_slice(inputs);

        self.permute(&mut state);
        state[0]
    }
}

/// Shared Poseidon hasher carrying parameters for all three call shapes.
pub struct PoseidonHasher {
    w2: PoseidonParams,
    w3: PoseidonParams,
    w4: PoseidonParams,
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseidonHasher {
    /// Build a hasher with the standard parameters for all widths.
    pub fn new() -> Self {
        // The three widths are in SUPPORTED_WIDTHS, so parameter loading
        // cannot fail.
        let w2 = PoseidonParams::new(2).unwrap_or_else(|_| unreachable!());
        let w3 = PoseidonParams::new(3).unwrap_or_else(|_| unreachable!());
        let w4 = PoseidonParams::new(4).unwrap_or_else(|_| unreachable!());
        Self { w2, w3, w4 }
    }

    /// Hash a single field element (t = 2).
    pub fn hash1(&self, a: &Fr) -> Fr {
        self.w2.hash(&[*a])
    }

    /// Hash two field elements (t = 3).
    pub fn hash2(&self, a: &Fr, b: &Fr) -> Fr {
        self.w3.hash(&[*a, *b])
    }

    /// Hash three field elements (t = 4).
    pub fn hash3(&self, a: &Fr, b: &Fr, c: &Fr) -> Fr {
        self.w4.hash(&[*a, *b, *c])
    }
}

/// S-box function: x^5
#[inline]
fn sbox(x: Fr) -> Fr {
    let x2 = x.square();
    let x4 = x2.square();
    x4 * x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash2_deterministic() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);

        assert_eq!(hasher.hash2(&a, &b), hasher.hash2(&a, &b));
    }

    #[test]
    fn test_hash2_different_inputs() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        let c = Fr::from(3u64);

        assert_ne!(hasher.hash2(&a, &b), hasher.hash2(&a, &c));
        assert_ne!(hasher.hash2(&a, &b), hasher.hash2(&b, &a));
    }

    #[test]
    fn test_call_shapes_are_domain_separated() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(7u64);
        let zero = Fr::from(0u64);

        // hash1(a) must not collide with hash2(a, 0) or hash3(a, 0, 0):
        // each width runs a different permutation.
        let h1 = hasher.hash1(&a);
        let h2 = hasher.hash2(&a, &zero);
        let h3 = hasher.hash3(&a, &zero, &zero);
        assert_ne!(h1, h2);
        assert_ne!(h2, h3);
    }

    #[test]
    fn test_fixed_vectors_are_stable() {
        // Regression pin for the cross-component agreement invariant: two
        // independently constructed hashers must produce identical values
        // for the canonical vectors.
        let h1 = PoseidonHasher::new();
        let h2 = PoseidonHasher::new();

        let v1 = h1.hash1(&Fr::from(12345u64));
        let v2 = h1.hash2(&Fr::from(1u64), &Fr::from(2u64));
        let v3 = h1.hash3(&Fr::from(1u64), &Fr::from(2u64), &Fr::from(3u64));

        assert_eq!(v1, h2.hash1(&Fr::from(12345u64)));
        assert_eq!(v2, h2.hash2(&Fr::from(1u64), &Fr::from(2u64)));
        assert_eq!(
            v3,
            h2.hash3(&Fr::from(1u64), &Fr::from(2u64), &Fr::from(3u64))
        );

        assert_ne!(v1, Fr::from(0u64));
        assert_ne!(v2, Fr::from(0u64));
        assert_ne!(v3, Fr::from(0u64));
    }

    #[test]
    fn test_fixed_vectors_pinned_to_literals() {
        // Absolute pin for the canonical vectors, computed independently
        // of this implementation. Comparing two in-process hashers (as
        // above) cannot catch a parameter change that shifts native and
        // gadget sides together; these literals can. If this test fails,
        // the hash function changed and every existing commitment, root
        // and proving key is invalidated.
        use crate::crypto::field::field_to_string;

        let hasher = PoseidonHasher::new();

        assert_eq!(
            field_to_string(&hasher.hash1(&Fr::from(12345u64))),
            "1895546542078774636090517267114973609968892265066453785524960787816768995974"
        );
        assert_eq!(
            field_to_string(&hasher.hash2(&Fr::from(1u64), &Fr::from(2u64))),
            "16201028637217862627310594546376903664232834394609720255765794661470242444274"
        );
        assert_eq!(
            field_to_string(&hasher.hash3(&Fr::from(1u64), &Fr::from(2u64), &Fr::from(3u64))),
            "8522237757485526428789924303964391894174208452779504532581721316463970973021"
        );
    }

    #[test]
    fn test_sbox() {
        let x = Fr::from(2u64);
        assert_eq!(sbox(x), Fr::from(32u64)); // 2^5 = 32
    }

    #[test]
    fn test_unsupported_width_rejected() {
        assert!(PoseidonParams::new(7).is_err());
    }
}
