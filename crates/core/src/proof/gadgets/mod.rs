//! R1CS constraint gadgets shared by the ticket circuit.

pub mod merkle;
pub mod poseidon;

pub use merkle::MerklePathGadget;
pub use poseidon::{poseidon_hash2_gadget, poseidon_hash3_gadget, PoseidonGadget};
