//! Small helpers shared across protocol implementations: peer iteration,
//! blame collection, and BigNumber/curve interop.

use generic_ec::{Curve, Scalar};
use libpaillier::unknown_order::BigNumber;
use rand_core::RngCore;

/// Identifies which party (and, where known, which message) caused a round
/// to abort. Carried in [`crate::Error::ProtocolAborted`] so a caller can
/// drop/exclude that party and retry, rather than the whole session
/// failing opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AbortBlame {
    pub party: u16,
}

impl AbortBlame {
    pub fn new(party: u16) -> Self {
        Self { party }
    }
}

/// Iterates every party index `0..n` except `i`, in ascending order.
pub fn iter_peers(i: u16, n: u16) -> impl Iterator<Item = u16> {
    (0..n).filter(move |&j| j != i)
}

/// Iterates `xs` skipping the `n`th element.
pub fn but_nth<T>(n: u16, xs: impl Iterator<Item = T>) -> impl Iterator<Item = T> {
    xs.enumerate()
        .filter(move |(idx, _)| *idx != usize::from(n))
        .map(|(_, x)| x)
}

/// Folds blame over a slice of `(party, value)` pairs, keeping every party
/// for which `pred` returns true.
pub fn collect_blame<T>(items: &[(u16, T)], mut pred: impl FnMut(u16, &T) -> bool) -> Vec<AbortBlame> {
    items
        .iter()
        .filter(|(j, v)| pred(*j, v))
        .map(|(j, _)| AbortBlame::new(*j))
        .collect()
}

/// XORs two equal-length byte buffers together, returning the combined
/// buffer. Used to combine every party's `rid` contribution into one
/// collective random value no single party controls.
pub fn xor_bytes(a: &mut [u8], b: &[u8]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x ^= y;
    }
}

/// Converts a curve scalar into a `BigNumber` for use as a Paillier
/// plaintext (Paillier doesn't know about the curve's field, so the value
/// is just an integer in `[0, q)` to it).
pub fn scalar_to_bignumber<E: Curve>(x: &Scalar<E>) -> BigNumber {
    BigNumber::from_slice(x.to_be_bytes().as_bytes())
}

/// Reduces a `BigNumber` back into a curve scalar modulo the group order.
/// Conceptually the inverse of [`scalar_to_bignumber`], but reduces rather
/// than requiring an exact round trip, since Paillier-decrypted values can
/// exceed `q` before the caller reduces them.
pub fn bignumber_to_scalar<E: Curve>(x: &BigNumber) -> Scalar<E> {
    let bytes = x.to_bytes();
    Scalar::<E>::from_be_bytes_mod_order(&bytes)
}

/// Samples a uniformly random element of `(Z/nZ)*`, i.e. invertible mod `n`
/// (retries on the rare non-invertible draw — not a timing concern since
/// `n`'s factors are either unknown to the sampler, or, for a locally
/// generated modulus, astronomically unlikely to collide with a random
/// sample).
pub fn sample_invertible<R: RngCore>(n: &BigNumber, rng: &mut R) -> BigNumber {
    loop {
        let r = BigNumber::from_rng(n, rng);
        if r.gcd(n) == BigNumber::one() {
            return r;
        }
    }
}

/// Integer square root (used to pass `n_root` to the no-small-factor
/// proof, which needs an a-priori bound on `sqrt(N)`).
pub fn isqrt(n: &BigNumber) -> BigNumber {
    n.sqrt()
}
