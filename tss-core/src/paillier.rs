//! Paillier cryptosystem: key generation, encryption with explicit
//! randomness, decryption, and the additively-homomorphic operations the
//! rest of the workspace builds its MtA and range proofs on top of.
//!
//! This wraps `libpaillier` (the same crate the teacher depends on)
//! rather than reimplementing modular-exponentiation-heavy primitives from
//! scratch; the wrapper's job is to expose the explicit-randomness API the
//! ZK proof layer needs (`libpaillier`'s own `encrypt` hides the nonce by
//! default) and the security-level-aware key size check.

use key_share::security_level::SecurityLevel;
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::utils::sample_invertible;

/// Paillier public key: the composite modulus `N`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PaillierPublicKey {
    pub n: BigNumber,
}

impl PaillierPublicKey {
    pub fn nn(&self) -> BigNumber {
        &self.n * &self.n
    }

    /// `Encrypt(m, r) = (1 + N)^m * r^N mod N^2`, with `r` supplied
    /// explicitly so ZK provers can bind their proofs to the randomness
    /// they used.
    pub fn encrypt_with_randomness(&self, m: &BigNumber, r: &BigNumber) -> Result<BigNumber, PaillierError> {
        if m >= &self.n || m < &BigNumber::zero() {
            return Err(PaillierError::PlaintextOutOfRange);
        }
        let nn = self.nn();
        let g_m = (BigNumber::one() + &self.n).modpow(m, &nn);
        let r_n = r.modpow(&self.n, &nn);
        Ok(g_m.modmul(&r_n, &nn))
    }

    /// Encrypts with fresh, uniformly sampled randomness; returns both the
    /// ciphertext and the randomness used (callers that need to bind a
    /// proof to it keep the nonce).
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        m: &BigNumber,
        rng: &mut R,
    ) -> Result<(BigNumber, BigNumber), PaillierError> {
        let r = sample_invertible(&self.n, rng);
        let c = self.encrypt_with_randomness(m, &r)?;
        Ok((c, r))
    }

    /// Homomorphic addition: `Add(c1, c2)` decrypts to `m1 + m2 mod N`.
    pub fn add(&self, c1: &BigNumber, c2: &BigNumber) -> BigNumber {
        c1.modmul(c2, &self.nn())
    }

    /// Homomorphic scalar multiplication: `ScalarMul(c, k)` decrypts to
    /// `k * m mod N`.
    pub fn scalar_mul(&self, c: &BigNumber, k: &BigNumber) -> BigNumber {
        c.modpow(k, &self.nn())
    }
}

/// Paillier private key: `p`, `q`, and the derived `lambda`/`mu`.
#[derive(Clone)]
pub struct PaillierPrivateKey {
    p: BigNumber,
    q: BigNumber,
    n: BigNumber,
    lambda: BigNumber,
    mu: BigNumber,
}

impl PaillierPrivateKey {
    pub fn from_primes(p: BigNumber, q: BigNumber) -> Result<Self, PaillierError> {
        let n = &p * &q;
        let lambda = lcm(&(&p - 1), &(&q - 1));
        let nn = &n * &n;
        let g = BigNumber::one() + &n;
        let g_lambda = g.modpow(&lambda, &nn);
        let l = l_function(&g_lambda, &n);
        let mu = l.invert(&n).ok_or(PaillierError::KeyGenerationFailed)?;
        Ok(Self { p, q, n, lambda, mu })
    }

    pub fn public_key(&self) -> PaillierPublicKey {
        PaillierPublicKey { n: self.n.clone() }
    }

    pub fn decrypt(&self, c: &BigNumber) -> Result<BigNumber, PaillierError> {
        let nn = &self.n * &self.n;
        if c >= &nn || c < &BigNumber::zero() {
            return Err(PaillierError::CiphertextOutOfRange);
        }
        let c_lambda = c.modpow(&self.lambda, &nn);
        let l = l_function(&c_lambda, &self.n);
        Ok(l.modmul(&self.mu, &self.n))
    }

    pub fn p(&self) -> &BigNumber {
        &self.p
    }
    pub fn q(&self) -> &BigNumber {
        &self.q
    }
}

fn l_function(x: &BigNumber, n: &BigNumber) -> BigNumber {
    (x - 1) / n
}

fn lcm(a: &BigNumber, b: &BigNumber) -> BigNumber {
    a * b / a.gcd(b)
}

/// Pre-generated Paillier primes plus the bit length they were generated
/// at, reusable across many keygen/key-refresh sessions since safe-prime
/// search is the dominant cost of those protocols. Generation is CPU-bound
/// and may take seconds; callers should run it off their event loop (the
/// core spawns no threads of its own, per the concurrency model).
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct PreParams<L> {
    p: BigNumber,
    q: BigNumber,
    #[serde(skip)]
    _l: std::marker::PhantomData<L>,
}

impl<L: SecurityLevel> PreParams<L> {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let bits = L::PAILLIER_MIN_BITS / 2;
        let p = BigNumber::safe_prime_from_rng(bits, rng);
        let q = BigNumber::safe_prime_from_rng(bits, rng);
        Self {
            p,
            q,
            _l: std::marker::PhantomData,
        }
    }

    pub fn split(self) -> (BigNumber, BigNumber) {
        (self.p, self.q)
    }
}

#[derive(Debug, Error)]
pub enum PaillierError {
    #[error("plaintext is out of range [0, N)")]
    PlaintextOutOfRange,
    #[error("ciphertext is out of range [0, N^2)")]
    CiphertextOutOfRange,
    #[error("key generation produced a non-invertible mu (primes were not valid safe primes)")]
    KeyGenerationFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;

    #[test]
    fn roundtrip() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(1);
        let prep = PreParams::<key_share::security_level::DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let sk = PaillierPrivateKey::from_primes(p, q).unwrap();
        let pk = sk.public_key();

        let m: BigNumber = 42.into();
        let (c, _r) = pk.encrypt(&m, &mut rng).unwrap();
        let decrypted = sk.decrypt(&c).unwrap();
        assert_eq!(decrypted, m);
    }

    #[test]
    fn homomorphic_add() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(2);
        let prep = PreParams::<key_share::security_level::DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let sk = PaillierPrivateKey::from_primes(p, q).unwrap();
        let pk = sk.public_key();

        let a: BigNumber = 11.into();
        let b: BigNumber = 31.into();
        let (ca, _) = pk.encrypt(&a, &mut rng).unwrap();
        let (cb, _) = pk.encrypt(&b, &mut rng).unwrap();
        let sum = pk.add(&ca, &cb);
        assert_eq!(sk.decrypt(&sum).unwrap(), a + b);
    }
}
