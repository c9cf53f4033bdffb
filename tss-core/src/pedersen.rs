//! Ring-Pedersen commitment parameters: `(N, s, t)` with `s = t^lambda mod N`
//! for a secret exponent `lambda`, used throughout the ZK proof suite to
//! commit to big-integer witnesses without revealing them.

use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::utils::sample_invertible;

/// Public Pedersen parameters a party publishes alongside its Paillier key:
/// every other party uses these to verify range proofs this party is the
/// verifier for.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PedersenParameters {
    pub n: BigNumber,
    pub s: BigNumber,
    pub t: BigNumber,
}

impl PedersenParameters {
    /// Commits to `(x, r)` as `s^x * t^r mod N`.
    pub fn commit(&self, x: &BigNumber, r: &BigNumber) -> BigNumber {
        let s_x = self.s.modpow(x, &self.n);
        let t_r = self.t.modpow(r, &self.n);
        s_x.modmul(&t_r, &self.n)
    }
}

/// The trapdoor behind a set of [`PedersenParameters`]: the discrete log of
/// `s` base `t` (or vice versa), known only to the generating party, needed
/// to open a DLN proof of well-formedness.
pub struct PedersenTrapdoor {
    pub params: PedersenParameters,
    lambda: BigNumber,
    phi_n: BigNumber,
}

impl PedersenTrapdoor {
    /// Derives `(N, s, t)` from a Paillier modulus's prime factors: `N` is
    /// reused directly, `t` is a random element of `(Z/NZ)*`, `lambda` is a
    /// random exponent mod `phi(N)`, and `s = t^lambda mod N`.
    pub fn generate<R: RngCore + CryptoRng>(p: &BigNumber, q: &BigNumber, rng: &mut R) -> Result<Self, PedersenError> {
        let n = p * q;
        let phi_n = (p - 1) * (q - 1);
        if phi_n <= BigNumber::zero() {
            return Err(PedersenError::DegenerateModulus);
        }
        let t0 = sample_invertible(&n, rng);
        let t = t0.modmul(&t0, &n);
        let lambda = BigNumber::from_rng(&phi_n, rng);
        let s = t.modpow(&lambda, &n);
        Ok(Self {
            params: PedersenParameters { n, s, t },
            lambda,
            phi_n,
        })
    }

    pub fn lambda(&self) -> &BigNumber {
        &self.lambda
    }

    pub fn phi_n(&self) -> &BigNumber {
        &self.phi_n
    }
}

#[derive(Debug, Error)]
pub enum PedersenError {
    #[error("modulus factors produced a non-positive totient")]
    DegenerateModulus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;

    #[test]
    fn commitment_hides_and_opens() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(7);
        let prep =
            crate::paillier::PreParams::<key_share::security_level::DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let trapdoor = PedersenTrapdoor::generate(&p, &q, &mut rng).unwrap();

        let x: BigNumber = 123.into();
        let r: BigNumber = 456.into();
        let c1 = trapdoor.params.commit(&x, &r);
        let c2 = trapdoor.params.commit(&x, &r);
        assert_eq!(c1, c2);

        let other: BigNumber = 124.into();
        assert_ne!(c1, trapdoor.params.commit(&other, &r));
    }
}
