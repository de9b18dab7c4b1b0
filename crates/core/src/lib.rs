//! Anonymous ticket core: payment commitments, a Poseidon Merkle
//! accumulator and Groth16 membership proofs over BN254.
//!
//! The flow has two halves that never share buyer identity:
//!
//! - [`issuer::CommitmentIssuer`] records a completed payment by
//!   inserting `hash3(secret, quote_id, price)` into the accumulator and
//!   returning the secret plus authentication path to the buyer;
//! - [`verifier::ProofVerifier`] later accepts a zero-knowledge proof
//!   that *some* commitment in the tree matches the quote and price being
//!   redeemed, without learning which one.
//!
//! [`TicketCore`] wires both halves around one shared accumulator.

pub mod config;
pub mod crypto;
pub mod error;
pub mod issuer;
pub mod proof;
pub mod verifier;

use std::sync::{Arc, Mutex};

use tracing::info;

pub use config::CoreConfig;
pub use crypto::{
    AccumulatorState, FieldEncoder, MerkleAccumulator, MerklePath, PoseidonHasher, TREE_DEPTH,
};
pub use error::{CoreError, CoreResult};
pub use issuer::{CommitmentIssuer, PaymentCommitment};
pub use proof::{Groth16ProofData, TicketCircuit, TicketVerifyingKey, PUBLIC_SIGNAL_COUNT};
pub use verifier::{ProofVerifier, RejectReason, VerifyOutcome, VerifyRequest};

use crypto::field::field_to_string;

/// The assembled ticket core: issuer and verifier over one accumulator.
pub struct TicketCore {
    issuer: CommitmentIssuer,
    verifier: ProofVerifier,
    tree: Arc<Mutex<MerkleAccumulator>>,
    hasher: Arc<PoseidonHasher>,
}

impl TicketCore {
    /// Assemble the core from a configuration, loading the verifying key
    /// from disk. A missing or corrupt key artifact fails construction.
    pub fn from_config(config: &CoreConfig) -> CoreResult<Self> {
        let verifying_key = proof::artifacts::load_verifying_key(&config.verifying_key_path)?;
        Self::new(config, verifying_key)
    }

    /// Assemble the core with an already loaded verifying key.
    pub fn new(config: &CoreConfig, verifying_key: TicketVerifyingKey) -> CoreResult<Self> {
        let hasher = Arc::new(PoseidonHasher::new());
        let tree = MerkleAccumulator::with_depth(hasher.clone(), config.tree_depth)?
            .with_root_window(config.root_window);
        let tree = Arc::new(Mutex::new(tree));

        let encoder = FieldEncoder::new(hasher.clone());
        let issuer = CommitmentIssuer::new(hasher.clone(), encoder.clone(), tree.clone());
        let verifier = ProofVerifier::new(verifying_key, encoder, tree.clone());

        info!(
            tree_depth = config.tree_depth,
            root_window = config.root_window,
            "ticket core initialized"
        );

        Ok(Self {
            issuer,
            verifier,
            tree,
            hasher,
        })
    }

    /// Record a completed payment and return the buyer's proof material.
    pub fn process_payment(&self, quote_id: &str, price_cents: u64) -> CoreResult<PaymentCommitment> {
        self.issuer.process_payment(quote_id, price_cents)
    }

    /// Verify a redemption proof.
    pub fn verify_payment_proof(&self, request: &VerifyRequest) -> CoreResult<VerifyOutcome> {
        self.verifier.verify(request)
    }

    /// Current accumulator root as a decimal string.
    pub fn current_root(&self) -> CoreResult<String> {
        Ok(field_to_string(&self.issuer.current_root()?))
    }

    pub fn leaf_count(&self) -> CoreResult<u64> {
        self.issuer.leaf_count()
    }

    /// Snapshot the accumulator for persistence.
    pub fn export_state(&self) -> CoreResult<AccumulatorState> {
        self.issuer.export_state()
    }

    /// Replace the accumulator with an imported state. The root log
    /// restarts at the imported tree's current root; the configured
    /// window size carries over.
    pub fn import_state(&self, state: &AccumulatorState) -> CoreResult<()> {
        let mut tree = self
            .tree
            .lock()
            .map_err(|_| CoreError::Internal("accumulator lock poisoned".into()))?;
        let restored = MerkleAccumulator::import_state(self.hasher.clone(), state)?
            .with_root_window(tree.root_window());
        *tree = restored;
        info!(leaf_count = state.next_index, "accumulator state imported");
        Ok(())
    }
}
