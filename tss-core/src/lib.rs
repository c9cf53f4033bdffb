//! Multi-party protocol state machines: two-party ECDSA, (t, n) threshold
//! ECDSA (keygen/reshare/sign), threshold EdDSA, and the BIP32-style
//! derivation that preserves shareability across all of them.
//!
//! The cryptographic primitives (Paillier, Ring-Pedersen, the ZK proof
//! suite) and the generic round-buffering [`key_share::session`] harness
//! live alongside these protocols; `key-share` and `threshold-keygen` hold
//! the data types and the Feldman-VSS DKG skeleton they're both built on.

pub mod bip32;
pub mod eddsa;
pub mod error;
pub mod execution_id;
pub mod paillier;
pub mod pedersen;
pub mod progress;
pub mod rng;
pub mod supported_curves;
pub mod threshold_ecdsa;
pub mod trusted_dealer;
pub mod twoparty;
pub mod utils;
pub mod zk;

pub use error::Error;
pub use execution_id::ExecutionId;

pub use key_share::session;
