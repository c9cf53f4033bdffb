//! Threshold EdDSA (ed25519): key generation and signing over
//! `curve25519_dalek`'s Edwards group, independent of the `generic_ec`
//! machinery the ECDSA side runs on.

pub mod keygen;
pub mod sign;
