//! Membership circuit for anonymous ticket payments.
//!
//! Proves knowledge of a secret and an authentication path such that
//! `hash3(secret, quote_id, price)` is a leaf of the tree with the public
//! root, without revealing which leaf.
//!
//! Public inputs, in allocation order:
//! - `out_root`, `out_quote_id`, `out_price`: output mirrors, constrained
//!   equal to the inputs below so a verifier can read the bound values
//!   positionally from the front of the flat signal array.
//! - `root`: the Merkle root the payment was committed under
//! - `quote_id`: the field-encoded quote identifier
//! - `price`: the price in cents
//!
//! Private inputs (witness):
//! - `secret`: the payer's commitment secret
//! - `path_elements[TREE_DEPTH]`, `path_indices[TREE_DEPTH]`: the
//!   authentication path (direction bits are `Boolean` witnesses, which
//!   enforces booleanity)

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use super::gadgets::merkle::MerklePathGadget;
use super::gadgets::poseidon::poseidon_hash3_gadget;
use crate::crypto::merkle::TREE_DEPTH;

/// Number of public signals the circuit exposes
/// (three output mirrors followed by the three public inputs).
pub const PUBLIC_SIGNAL_COUNT: usize = 6;

/// Ticket membership circuit.
#[derive(Clone)]
pub struct TicketCircuit {
    // ===== Public inputs =====
    pub root: Fr,
    pub quote_id: Fr,
    pub price: Fr,

    // ===== Private inputs (witness) =====
    pub secret: Fr,
    pub path_elements: Vec<Fr>,
    pub path_indices: Vec<bool>,
}

impl TicketCircuit {
    pub fn new(
        root: Fr,
        quote_id: Fr,
        price: Fr,
        secret: Fr,
        path_elements: Vec<Fr>,
        path_indices: Vec<bool>,
    ) -> Self {
        Self {
            root,
            quote_id,
            price,
            secret,
            path_elements,
            path_indices,
        }
    }

    /// All-zero circuit used for key generation; the witness values are
    /// irrelevant to setup, only the constraint shape matters.
    pub fn blank() -> Self {
        Self {
            root: Fr::from(0u64),
            quote_id: Fr::from(0u64),
            price: Fr::from(0u64),
            secret: Fr::from(0u64),
            path_elements: vec![Fr::from(0u64); TREE_DEPTH],
            path_indices: vec![false; TREE_DEPTH],
        }
    }

    /// The public signal vector a proof of this circuit verifies against:
    /// `[root, quote_id, price, root, quote_id, price]` (mirrors first).
    pub fn public_signals(&self) -> Vec<Fr> {
        vec![
            self.root,
            self.quote_id,
            self.price,
            self.root,
            self.quote_id,
            self.price,
        ]
    }
}

impl ConstraintSynthesizer<Fr> for TicketCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // ===== Output mirrors =====
        let out_root = FpVar::new_input(cs.clone(), || Ok(self.root))?;
        let out_quote_id = FpVar::new_input(cs.clone(), || Ok(self.quote_id))?;
        let out_price = FpVar::new_input(cs.clone(), || Ok(self.price))?;

        // ===== Public inputs =====
        let root = FpVar::new_input(cs.clone(), || Ok(self.root))?;
        let quote_id = FpVar::new_input(cs.clone(), || Ok(self.quote_id))?;
        let price = FpVar::new_input(cs.clone(), || Ok(self.price))?;

        out_root.enforce_equal(&root)?;
        out_quote_id.enforce_equal(&quote_id)?;
        out_price.enforce_equal(&price)?;

        // ===== Witness =====
        let secret = FpVar::new_witness(cs.clone(), || Ok(self.secret))?;
        let path =
            MerklePathGadget::new_witness(cs.clone(), &self.path_elements, &self.path_indices)?;

        // leaf = hash3(secret, quote_id, price)
        let leaf = poseidon_hash3_gadget(cs.clone(), &secret, &quote_id, &price)?;

        // The path must recombine the leaf into the public root.
        path.verify(cs, &leaf, &root)?;

        Ok(())
    }
}
