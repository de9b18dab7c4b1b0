//! Merkle path verification gadget.
//!
//! Expresses the accumulator's conditional-swap-and-hash fold as R1CS
//! constraints. The swap is a pair of `Boolean::select` calls compiled to
//! multiplication gates; circuits cannot branch.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::poseidon::poseidon_hash2_gadget;
use crate::crypto::merkle::TREE_DEPTH;

/// In-circuit authentication path.
pub struct MerklePathGadget {
    /// Sibling hashes along the path
    pub siblings: Vec<FpVar<Fr>>,
    /// Direction bits (false = current node is the left child). Allocating
    /// these as `Boolean` witnesses enforces the x*(x-1) = 0 constraint.
    pub indices: Vec<Boolean<Fr>>,
}

impl MerklePathGadget {
    /// Allocate a path of exactly `TREE_DEPTH` levels as witnesses.
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        siblings: &[Fr],
        indices: &[bool],
    ) -> Result<Self, SynthesisError> {
        if siblings.len() != TREE_DEPTH || indices.len() != TREE_DEPTH {
            return Err(SynthesisError::AssignmentMissing);
        }

        let siblings: Result<Vec<FpVar<Fr>>, _> = siblings
            .iter()
            .map(|s| FpVar::new_witness(cs.clone(), || Ok(*s)))
            .collect();

        let indices: Result<Vec<Boolean<Fr>>, _> = indices
            .iter()
            .map(|&i| Boolean::new_witness(cs.clone(), || Ok(i)))
            .collect();

        Ok(Self {
            siblings: siblings?,
            indices: indices?,
        })
    }

    /// Enforce that the path recombines `leaf` into `expected_root`.
    pub fn verify(
        &self,
        cs: ConstraintSystemRef<Fr>,
        leaf: &FpVar<Fr>,
        expected_root: &FpVar<Fr>,
    ) -> Result<(), SynthesisError> {
        let computed_root = self.compute_root(cs, leaf)?;
        computed_root.enforce_equal(expected_root)?;
        Ok(())
    }

    /// Fold the leaf through the path, one conditional swap and hash per
    /// level.
    pub fn compute_root(
        &self,
        cs: ConstraintSystemRef<Fr>,
        leaf: &FpVar<Fr>,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        let mut current = leaf.clone();

        for (sibling, is_right) in self.siblings.iter().zip(self.indices.iter()) {
            // If is_right, current is the right input: hash(sibling, current);
            // otherwise hash(current, sibling).
            let left = is_right.select(sibling, &current)?;
            let right = is_right.select(&current, sibling)?;

            current = poseidon_hash2_gadget(cs.clone(), &left, &right)?;
        }

        Ok(current)
    }
}
