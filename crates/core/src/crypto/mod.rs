//! Cryptographic primitives: Poseidon hashing, field encoding, payment
//! commitments and the Merkle accumulator.

pub mod commitment;
pub mod field;
pub mod merkle;
pub mod poseidon;
pub mod poseidon_constants;

pub use commitment::{commitment_leaf, random_secret};
pub use field::{field_to_string, parse_field_str, FieldEncoder, FieldError};
pub use merkle::{
    verify_merkle_path, AccumulatorState, MerkleAccumulator, MerkleError, MerklePath, TREE_DEPTH,
};
pub use poseidon::{PoseidonError, PoseidonHasher, PoseidonParams};
