//! Commitment issuance for completed payments.
//!
//! On a successful payment the issuer mints a fresh secret, derives the
//! commitment leaf, appends it to the shared accumulator and hands the
//! buyer everything needed to later prove membership: the secret, the
//! authentication path and the root at insertion time. The secret is
//! returned once and never stored.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::crypto::commitment::{commitment_leaf, random_secret};
use crate::crypto::field::{field_to_string, FieldEncoder};
use crate::crypto::merkle::{AccumulatorState, MerkleAccumulator};
use crate::crypto::poseidon::PoseidonHasher;
use crate::error::{CoreError, CoreResult};

/// Authentication path in its boundary representation: decimal sibling
/// strings with 0/1 direction bits, leaf level first.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePathData {
    pub path_elements: Vec<String>,
    pub path_indices: Vec<u8>,
}

/// Everything a buyer receives for one paid ticket. The secret appears
/// here and nowhere else.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCommitment {
    pub secret: String,
    pub root: String,
    pub merkle_path: MerklePathData,
    pub quote_id: String,
    pub price_cents: u64,
    pub leaf_index: u64,
}

/// Issues commitments into the shared accumulator.
pub struct CommitmentIssuer {
    hasher: Arc<PoseidonHasher>,
    encoder: FieldEncoder,
    tree: Arc<Mutex<MerkleAccumulator>>,
}

impl CommitmentIssuer {
    pub fn new(
        hasher: Arc<PoseidonHasher>,
        encoder: FieldEncoder,
        tree: Arc<Mutex<MerkleAccumulator>>,
    ) -> Self {
        Self {
            hasher,
            encoder,
            tree,
        }
    }

    /// Record a completed payment: mint a secret, insert the commitment
    /// leaf and return the buyer's proof material.
    ///
    /// Insertion, path generation and the root snapshot happen under one
    /// lock acquisition, so the returned path is always consistent with
    /// the returned root even under concurrent payments.
    pub fn process_payment(&self, quote_id: &str, price_cents: u64) -> CoreResult<PaymentCommitment> {
        if quote_id.is_empty() {
            return Err(CoreError::InvalidInput("quote id must not be empty".into()));
        }
        if price_cents == 0 {
            return Err(CoreError::InvalidInput("price must be positive".into()));
        }

        let secret = random_secret();
        let quote_field = self.encoder.string_to_field(quote_id);
        let leaf = commitment_leaf(&self.hasher, &secret, &quote_field, price_cents);

        let mut tree = self.lock_tree()?;
        let leaf_index = tree.insert(leaf).map_err(|e| {
            warn!(quote_id, error = %e, "commitment insertion failed");
            e
        })?;
        let path = tree.proof(leaf_index)?;
        let root = tree.root();
        drop(tree);

        info!(quote_id, price_cents, leaf_index, "issued payment commitment");

        Ok(PaymentCommitment {
            secret: field_to_string(&secret),
            root: field_to_string(&root),
            merkle_path: MerklePathData {
                path_elements: path.siblings.iter().map(field_to_string).collect(),
                path_indices: path.indices.iter().map(|&b| b as u8).collect(),
            },
            quote_id: quote_id.to_string(),
            price_cents,
            leaf_index,
        })
    }

    /// Current accumulator root.
    pub fn current_root(&self) -> CoreResult<Fr> {
        Ok(self.lock_tree()?.root())
    }

    pub fn leaf_count(&self) -> CoreResult<u64> {
        Ok(self.lock_tree()?.leaf_count())
    }

    /// Snapshot the accumulator for persistence.
    pub fn export_state(&self) -> CoreResult<AccumulatorState> {
        Ok(self.lock_tree()?.export_state())
    }

    fn lock_tree(&self) -> CoreResult<std::sync::MutexGuard<'_, MerkleAccumulator>> {
        self.tree
            .lock()
            .map_err(|_| CoreError::Internal("accumulator lock poisoned".into()))
    }
}
