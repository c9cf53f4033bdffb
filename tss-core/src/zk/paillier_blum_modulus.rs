//! Paillier-Blum modulus proof (Π_mod): proves a Paillier modulus `N` is a
//! product of two primes (and, more specifically, a Blum integer: both
//! primes congruent to 3 mod 4), without revealing them. Signing protocols
//! that rely on a counterparty's Paillier modulus having exactly two prime
//! factors — rather than, say, one the counterparty can factor via a
//! small-subgroup trick — require this once per published key.
//!
//! **[ADDED]**: not named directly in the distilled proof list, but
//! standard in the aux-info round of every CGGMP21-family threshold ECDSA
//! implementation (including the teacher's `cggmp21::key_refresh`), and
//! necessary for the no-small-factor proof below to mean anything.

use digest::Digest;
use key_share::security_level::SecurityLevel;
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};

use super::challenge::{InvalidProof, Transcript};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Proof {
    w: BigNumber,
    /// Per-round `(x, a, b, z)`: `x` a fourth (or square) root of the
    /// round's challenge `y_i` after adjusting its sign/twofold factor by
    /// `(a, b)`, `z` a witness that `y_i` is invertible mod `N`.
    rounds: Vec<ModRound>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ModRound {
    x: BigNumber,
    a: bool,
    b: bool,
    z: BigNumber,
}

fn repetitions<L: SecurityLevel>() -> usize {
    L::SECURITY_BITS
}

/// Finds a quadratic non-residue `w` mod `N` with Jacobi symbol -1, which
/// exists for any Blum integer and is easy to find by rejection sampling
/// once `p, q` are known.
fn find_non_residue<R: RngCore + CryptoRng>(n: &BigNumber, p: &BigNumber, q: &BigNumber, rng: &mut R) -> BigNumber {
    loop {
        let w = BigNumber::from_rng(n, rng);
        if jacobi(&w, p) == -1 && jacobi(&w, q) == -1 {
            return w;
        }
    }
}

/// Jacobi symbol via repeated quadratic reciprocity; `p` here is prime, so
/// this also serves as the Legendre symbol used by [`find_non_residue`].
fn jacobi(a: &BigNumber, n: &BigNumber) -> i32 {
    let mut a = a % n;
    let mut n = n.clone();
    let mut result = 1;
    while a != BigNumber::zero() {
        while (&a % 2) == BigNumber::zero() {
            a /= 2;
            let r = &n % 8;
            if r == BigNumber::from(3) || r == BigNumber::from(5) {
                result = -result;
            }
        }
        std::mem::swap(&mut a, &mut n);
        if (&a % 4) == BigNumber::from(3) && (&n % 4) == BigNumber::from(3) {
            result = -result;
        }
        a %= &n;
    }
    if n == BigNumber::one() {
        result
    } else {
        0
    }
}

/// Computes a fourth root of `y` mod `N = p*q`, trying the four square
/// roots of `y`'s residues mod `p`/`q` combined via CRT, after adjusting
/// `y` by a sign (`a`) and factor of `w` (`b`) so it is always a quadratic
/// residue. Returns `(x, a, b)`.
fn fourth_root(y: &BigNumber, p: &BigNumber, q: &BigNumber, n: &BigNumber, w: &BigNumber) -> (BigNumber, bool, bool) {
    for a in [false, true] {
        for b in [false, true] {
            let mut candidate = y.clone();
            if a {
                candidate = n - &candidate;
            }
            if b {
                candidate = candidate.modmul(w, n);
            }
            if jacobi(&candidate, p) == 1 && jacobi(&candidate, q) == 1 {
                if let Some(root) = sqrt_mod_pq(&candidate, p, q, n) {
                    if let Some(fourth) = sqrt_mod_pq(&root, p, q, n) {
                        return (fourth, a, b);
                    }
                }
            }
        }
    }
    (BigNumber::zero(), false, false)
}

/// Square root mod `N = p*q` via CRT, assuming `p ≡ q ≡ 3 (mod 4)` (true
/// for a Blum integer), for which `sqrt(x) mod p = x^((p+1)/4) mod p`.
fn sqrt_mod_pq(x: &BigNumber, p: &BigNumber, q: &BigNumber, n: &BigNumber) -> Option<BigNumber> {
    let exp_p = (p + 1) / 4;
    let exp_q = (q + 1) / 4;
    let rp = x.modpow(&exp_p, p);
    let rq = x.modpow(&exp_q, q);
    if rp.modpow(&BigNumber::from(2), p) != (x % p) || rq.modpow(&BigNumber::from(2), q) != (x % q) {
        return None;
    }
    // CRT-combine rp (mod p) and rq (mod q).
    let q_inv_mod_p = q.invert(p)?;
    let p_inv_mod_q = p.invert(q)?;
    let term1 = (&rp * q * &q_inv_mod_p) % n;
    let term2 = (&rq * p * &p_inv_mod_q) % n;
    Some((term1 + term2) % n)
}

pub fn prove<L: SecurityLevel, D: Digest, R: RngCore + CryptoRng>(
    sid: &[u8],
    n: &BigNumber,
    p: &BigNumber,
    q: &BigNumber,
    rng: &mut R,
) -> Proof {
    let m = repetitions::<L>();
    let w = find_non_residue(n, p, q, rng);
    let phi_n = (p - 1) * (q - 1);
    let n_inv_mod_phi = n.invert(&phi_n).expect("gcd(N, phi(N)) = 1 for a Blum integer");

    let mut transcript = Transcript::<D>::new(sid);
    transcript.mix_bignumber(n).mix_bignumber(&w);
    let ys: Vec<BigNumber> = (0..m)
        .map(|i| {
            transcript.mix_bytes(&(i as u64).to_be_bytes());
            transcript.challenge_bignumber(n.bit_length()) % n
        })
        .collect();

    let rounds = ys
        .iter()
        .map(|y| {
            let (x, a, b) = fourth_root(y, p, q, n, &w);
            let z = y.modpow(&n_inv_mod_phi, n);
            ModRound { x, a, b, z }
        })
        .collect();

    Proof { w, rounds }
}

pub fn verify<L: SecurityLevel, D: Digest>(sid: &[u8], n: &BigNumber, proof: &Proof) -> Result<(), InvalidProof> {
    let m = repetitions::<L>();
    if proof.rounds.len() != m {
        return Err(InvalidProof("wrong repetition count"));
    }
    if (n % 2) == BigNumber::zero() {
        return Err(InvalidProof("modulus is even"));
    }

    let mut transcript = Transcript::<D>::new(sid);
    transcript.mix_bignumber(n).mix_bignumber(&proof.w);
    for (i, round) in proof.rounds.iter().enumerate() {
        transcript.mix_bytes(&(i as u64).to_be_bytes());
        let y = transcript.challenge_bignumber(n.bit_length()) % n;

        if round.z.modpow(n, n) != y {
            return Err(InvalidProof("z is not an n-th root of y"));
        }

        let mut candidate = y;
        if round.a {
            candidate = n - &candidate;
        }
        if round.b {
            candidate = candidate.modmul(&proof.w, n);
        }
        if round.x.modpow(&BigNumber::from(4), n) != candidate {
            return Err(InvalidProof("x is not a fourth root of the adjusted challenge"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use key_share::security_level::DevelopmentOnly;
    use rand_chacha::rand_core::SeedableRng;
    use sha2::Sha256;

    #[test]
    fn honest_proof_verifies() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(60);
        let prep = crate::paillier::PreParams::<DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let n = &p * &q;

        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &n, &p, &q, &mut rng);
        verify::<DevelopmentOnly, Sha256>(b"sid", &n, &proof).unwrap();
    }

    #[test]
    fn even_modulus_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(61);
        let prep = crate::paillier::PreParams::<DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let n = &p * &q;
        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &n, &p, &q, &mut rng);

        let even_n = &n + 1;
        assert!(verify::<DevelopmentOnly, Sha256>(b"sid", &even_n, &proof).is_err());
    }

    #[test]
    fn tampered_witness_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(62);
        let prep = crate::paillier::PreParams::<DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let n = &p * &q;
        let mut proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &n, &p, &q, &mut rng);
        proof.w += 2;
        assert!(verify::<DevelopmentOnly, Sha256>(b"sid", &n, &proof).is_err());
    }
}
