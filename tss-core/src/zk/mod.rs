//! Zero-knowledge proof library: the Sigma-protocols (made non-interactive
//! via Fiat-Shamir) every multi-party protocol in this crate uses to keep
//! peers honest without revealing their secrets.
//!
//! Every proof module exposes `prove`/`verify` taking `(&Data, &PrivateData,
//! &Aux, &mut Rng) -> Proof` and `(&Data, &Aux, &Proof) -> Result<(),
//! InvalidProof>`. Verification is exhaustive: every check in a proof runs,
//! and the first failing one determines the returned [`InvalidProof`].

pub mod challenge;
pub mod dln_proof;
pub mod group_vs_paillier;
pub mod no_small_factor;
pub mod paillier_blum_modulus;
pub mod paillier_encryption_in_range;
pub mod range_proof;
pub mod schnorr;

pub use challenge::InvalidProof;

use crate::pedersen::PedersenParameters;

/// Auxiliary commitment scheme a proof is checked against: the verifier's
/// own Ring-Pedersen parameters, published and DLN-proved ahead of time.
/// Its factorization must be unknown to whichever party is proving
/// statements to this verifier.
#[derive(Debug, Clone)]
pub struct Aux {
    pub pedersen: PedersenParameters,
}

/// Security parameters shared by the range-bearing proofs: `L` (claimed
/// range bit-length), `EPSILON` (soundness slack), and the Fiat-Shamir
/// challenge width.
pub trait ProofSecurityLevel: key_share::security_level::SecurityLevel {
    const Q_BITLEN: usize = 256;
}
impl<L: key_share::security_level::SecurityLevel> ProofSecurityLevel for L {}
