//! (t, n) threshold ECDSA: keygen (spec §4.5), reshare, and MtA-based
//! signing over a qualifying subset.
//!
//! `keygen` composes `threshold-keygen`'s Feldman DKG with an aux-info round
//! (Paillier keypair, Ring-Pedersen parameters, an El-Gamal key used by the
//! signing proofs, and the DLN/no-small-factor/Paillier-Blum proofs that
//! back them) into the signing-capable [`key_share::KeyShare`]. `reshare`
//! reuses the same composition with the DKG's constant term pinned to the
//! current secret. `sign` runs the multiplicative-to-additive (MtA)
//! sub-protocol pairwise across the signing subset.

pub mod keygen;
pub mod reshare;
pub mod sign;
