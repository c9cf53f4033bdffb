//! Security level parameters shared by every protocol in the workspace.
//!
//! A [`SecurityLevel`] fixes the statistical/computational parameters that
//! show up throughout the zero-knowledge proof suite and the Paillier key
//! generator: the claimed-range bit-length `L`, the soundness slack
//! `EPSILON`, the byte-length of the random `rid`/`sid` contributions, and
//! the Paillier modulus bit-length. Parameterizing protocols over a trait
//! (rather than hardcoding constants) lets tests run with tiny, fast values
//! while production code is pinned to [`ReasonablySecure`].

use serde::{Deserialize, Serialize};

/// A fixed-size byte array used for `rid`/`sid`-style random contributions.
pub trait SecurityLevel: Clone + Send + Sync + 'static {
    /// Number of bytes in the random `rid` contribution mixed into every
    /// DKG / key refresh transcript.
    const SECURITY_BYTES: usize;
    /// Same value in bits, for BigNumber APIs that want a bit-length.
    const SECURITY_BITS: usize = Self::SECURITY_BYTES * 8;
    /// Claimed range bit-length `L` used by range proofs.
    const ELL: usize;
    /// Soundness slack `EPSILON` used by range proofs.
    const EPSILON: usize;
    /// Minimal accepted Paillier modulus bit-length.
    const PAILLIER_MIN_BITS: usize;

    /// Random contribution type, `[u8; SECURITY_BYTES]` in all practical
    /// instantiations; kept as an associated type so it can be boxed for
    /// unusually large security levels without forcing a const-generic
    /// array everywhere it is threaded through.
    type Rid: AsRef<[u8]>
        + AsMut<[u8]>
        + Clone
        + Default
        + Send
        + Sync
        + Serialize
        + for<'de> Deserialize<'de>
        + 'static;

    fn q() -> crate::BigNumber {
        crate::BigNumber::one() << Self::ELL
    }
}

/// Production security level: 128-bit statistical security, 2048-bit
/// Paillier moduli. This is the only level reachable without opting into
/// [`DevelopmentOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonablySecure;

impl SecurityLevel for ReasonablySecure {
    const SECURITY_BYTES: usize = 32;
    const ELL: usize = 256;
    const EPSILON: usize = 384;
    const PAILLIER_MIN_BITS: usize = 2048;
    type Rid = [u8; 32];
}

/// Toy security level for fast unit tests only. The source this spec was
/// distilled from hardcoded a Paillier modulus size of 8 bits for its own
/// tests; we keep that reachable only behind this explicitly-named,
/// explicitly-opt-in type so it can never leak into a production key share
/// by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevelopmentOnly;

impl SecurityLevel for DevelopmentOnly {
    const SECURITY_BYTES: usize = 16;
    const ELL: usize = 64;
    const EPSILON: usize = 96;
    const PAILLIER_MIN_BITS: usize = 256;
    type Rid = [u8; 16];
}
