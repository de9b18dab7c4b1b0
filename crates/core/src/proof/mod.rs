//! Groth16 proof system for the ticket membership circuit.
//!
//! Components:
//! - `circuit`: the membership circuit (`TicketCircuit`)
//! - `gadgets`: R1CS constraint gadgets (Poseidon, Merkle path)
//! - `encoding`: boundary wire format for proofs and public signals
//! - `artifacts`: key persistence; a missing verifying key is fatal at
//!   startup
//!
//! Proof *generation* normally happens client-side against published
//! circuit artifacts; the prover half here exists for key generation,
//! tests and tooling.

pub mod artifacts;
pub mod circuit;
pub mod encoding;
pub mod gadgets;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::rngs::OsRng;
use std::path::PathBuf;
use thiserror::Error;

pub use circuit::{TicketCircuit, PUBLIC_SIGNAL_COUNT};
pub use encoding::{Groth16ProofData, ProofDecodeError};

#[derive(Error, Debug)]
pub enum ProofError {
    #[error("setup failed: {0}")]
    SetupFailed(String),
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
    #[error("invalid proving key")]
    InvalidProvingKey,
    #[error("invalid verifying key")]
    InvalidVerifyingKey,
    #[error("verifying key artifact missing: {0}")]
    VerifyingKeyMissing(PathBuf),
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Prover half of the proof system.
pub struct TicketProver {
    proving_key: ProvingKey<Bn254>,
}

impl TicketProver {
    /// Generate a proof for a fully assigned circuit.
    pub fn prove(&self, circuit: TicketCircuit) -> Result<Proof<Bn254>, ProofError> {
        Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut OsRng)
            .map_err(|e| ProofError::GenerationFailed(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        let proving_key = ProvingKey::deserialize_compressed(bytes)
            .map_err(|_| ProofError::InvalidProvingKey)?;
        Ok(Self { proving_key })
    }
}

/// Verifier half: the verification key with its prepared form.
pub struct TicketVerifyingKey {
    verifying_key: VerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
}

impl TicketVerifyingKey {
    pub fn from_vk(verifying_key: VerifyingKey<Bn254>) -> Result<Self, ProofError> {
        let prepared = Groth16::<Bn254>::process_vk(&verifying_key)
            .map_err(|e| ProofError::SetupFailed(e.to_string()))?;
        Ok(Self {
            verifying_key,
            prepared,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        let verifying_key = VerifyingKey::deserialize_compressed(bytes)
            .map_err(|_| ProofError::InvalidVerifyingKey)?;
        Self::from_vk(verifying_key)
    }

    /// Run the native Groth16 verification algorithm. `Ok(false)` is a
    /// definitive cryptographic rejection; `Err` means the backend could
    /// not run (wrong signal arity for the key, for instance).
    pub fn verify_signals(
        &self,
        public_signals: &[Fr],
        proof: &Proof<Bn254>,
    ) -> Result<bool, ProofError> {
        Groth16::<Bn254>::verify_with_processed_vk(&self.prepared, public_signals, proof)
            .map_err(|e| ProofError::VerificationFailed(e.to_string()))
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }
}

/// Generate a proving/verifying key pair for the ticket circuit.
///
/// WARNING: this draws the toxic waste from local randomness and is
/// suitable only for development and tests. Production keys come from a
/// trusted setup ceremony and are loaded through `artifacts`.
pub fn setup() -> Result<(TicketProver, TicketVerifyingKey), ProofError> {
    let (pk, vk) = Groth16::<Bn254>::setup(TicketCircuit::blank(), &mut OsRng)
        .map_err(|e| ProofError::SetupFailed(e.to_string()))?;

    let prover = TicketProver { proving_key: pk };
    let verifying_key = TicketVerifyingKey::from_vk(vk)?;
    Ok((prover, verifying_key))
}
