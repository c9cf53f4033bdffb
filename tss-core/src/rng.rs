//! Randomness injection. Every protocol entry point takes a generic
//! `R: RngCore + CryptoRng` rather than reaching for a global RNG, so test
//! and simulation code can swap in a seeded `ChaCha20Rng` and get fully
//! reproducible transcripts (including the Paillier safe-prime search,
//! which dominates keygen's wall-clock cost).

use rand_core::{CryptoRng, RngCore};

/// Marker alias documenting the bound every session constructor requires.
/// Not a real trait to implement against; exists so call sites can write
/// `fn foo<R: SessionRng>(rng: &mut R)` instead of repeating the two bounds.
pub trait SessionRng: RngCore + CryptoRng {}
impl<T: RngCore + CryptoRng> SessionRng for T {}
