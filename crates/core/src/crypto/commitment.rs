//! Payment commitment leaves.
//!
//! A commitment binds a fresh random secret to the public payment
//! metadata: `leaf = hash3(secret, quote_field, price_cents)`. The secret
//! stays with the payer and later serves as the proof witness; the leaf is
//! the only thing the tree ever sees.

use ark_bn254::Fr;
use ark_ff::UniformRand;
use rand::rngs::OsRng;

use super::poseidon::PoseidonHasher;

/// Draw a fresh commitment secret from OS randomness, reduced into the
/// scalar field.
pub fn random_secret() -> Fr {
    Fr::rand(&mut OsRng)
}

/// Compute the commitment leaf for a payment.
///
/// `quote_field` must come from [`super::field::FieldEncoder::string_to_field`]
/// so the issuer and the circuit agree on the quote's numeric form.
pub fn commitment_leaf(
    hasher: &PoseidonHasher,
    secret: &Fr,
    quote_field: &Fr,
    price_cents: u64,
) -> Fr {
    hasher.hash3(secret, quote_field, &Fr::from(price_cents))
}
