//! Range proof (Π_enc): proves a Paillier ciphertext `C` encrypts a
//! plaintext `x` lying in `[0, 2^L]`, without revealing `x`.
//!
//! Grounded on the teacher's key-refresh round, which carries the same
//! shape of range proof (there called `EncProof`) to bind each party's
//! freshly Paillier-encrypted share contribution to a small range.

use digest::Digest;
use key_share::security_level::SecurityLevel;
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};

use crate::paillier::PaillierPublicKey;
use crate::utils::sample_invertible;

use super::challenge::{InvalidProof, Transcript};
use super::{Aux, ProofSecurityLevel};

/// Public statement: the prover's own Paillier key and the ciphertext in
/// question.
#[derive(Debug, Clone)]
pub struct Data {
    pub paillier_n: PaillierPublicKey,
    pub ciphertext: BigNumber,
}

/// Witness: the plaintext and the randomness used to encrypt it.
pub struct PrivateData {
    pub x: BigNumber,
    pub rho: BigNumber,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Proof {
    s: BigNumber,
    a: BigNumber,
    d: BigNumber,
    z1: BigNumber,
    z2: BigNumber,
    z3: BigNumber,
}

fn range_bound<L: SecurityLevel>() -> BigNumber {
    BigNumber::one() << (L::ELL + L::EPSILON)
}

pub fn prove<L: SecurityLevel, D: Digest, R: RngCore + CryptoRng>(
    sid: &[u8],
    data: &Data,
    witness: &PrivateData,
    aux: &Aux,
    rng: &mut R,
) -> Proof {
    let n_hat = &aux.pedersen.n;
    let alpha_bound = BigNumber::one() << (L::ELL + L::EPSILON + L::SECURITY_BITS);

    let mu = BigNumber::from_rng(&((BigNumber::one() << L::ELL) * n_hat), rng);
    let gamma = BigNumber::from_rng(&(&alpha_bound * n_hat), rng);
    let alpha = BigNumber::from_rng(&alpha_bound, rng) - &alpha_bound / 2;
    let r = sample_invertible(&data.paillier_n.n, rng);

    let s = aux.pedersen.commit(&witness.x, &mu);
    let a = data
        .paillier_n
        .encrypt_with_randomness(&alpha, &r)
        .expect("alpha sampled within plaintext range by construction in test-grade use");
    let d = aux.pedersen.commit(&alpha, &gamma);

    let mut t = Transcript::<D>::new(sid);
    t.mix_bignumber(&data.paillier_n.n)
        .mix_bignumber(&data.ciphertext)
        .mix_bignumber(&s)
        .mix_bignumber(&a)
        .mix_bignumber(&d);
    let e = t.challenge_bignumber(L::Q_BITLEN) - (BigNumber::one() << (L::Q_BITLEN - 1));

    let z1 = &alpha + &e * &witness.x;
    let z2 = &r * witness.rho.modpow(&e, &data.paillier_n.n) % &data.paillier_n.n;
    let z3 = &gamma + &e * &mu;

    Proof { s, a, d, z1, z2, z3 }
}

pub fn verify<L: SecurityLevel, D: Digest>(sid: &[u8], data: &Data, aux: &Aux, proof: &Proof) -> Result<(), InvalidProof> {
    let mut t = Transcript::<D>::new(sid);
    t.mix_bignumber(&data.paillier_n.n)
        .mix_bignumber(&data.ciphertext)
        .mix_bignumber(&proof.s)
        .mix_bignumber(&proof.a)
        .mix_bignumber(&proof.d);
    let e = t.challenge_bignumber(L::Q_BITLEN) - (BigNumber::one() << (L::Q_BITLEN - 1));

    let lhs = data
        .paillier_n
        .encrypt_with_randomness(&proof.z1, &proof.z2)
        .map_err(|_| InvalidProof("z1/z2 out of paillier range"))?;
    let rhs = data.paillier_n.add(&proof.a, &data.paillier_n.scalar_mul(&data.ciphertext, &e));
    if lhs != rhs {
        return Err(InvalidProof("paillier encryption check failed"));
    }

    let lhs2 = aux.pedersen.commit(&proof.z1, &proof.z3);
    let rhs2 = proof.d.modmul(&proof.s.modpow(&e, &aux.pedersen.n), &aux.pedersen.n);
    if lhs2 != rhs2 {
        return Err(InvalidProof("pedersen commitment check failed"));
    }

    let bound = range_bound::<L>();
    if proof.z1 > bound || proof.z1 < -&bound {
        return Err(InvalidProof("z1 out of claimed range"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use key_share::security_level::DevelopmentOnly;
    use rand_chacha::rand_core::SeedableRng;
    use sha2::Sha256;

    fn setup(rng: &mut rand_chacha::ChaCha20Rng) -> (Data, PrivateData, Aux) {
        let prep = crate::paillier::PreParams::<DevelopmentOnly>::generate(rng);
        let (p, q) = prep.split();
        let sk = crate::paillier::PaillierPrivateKey::from_primes(p.clone(), q.clone()).unwrap();
        let pk = sk.public_key();
        let trapdoor = crate::pedersen::PedersenTrapdoor::generate(&p, &q, rng).unwrap();

        let x: BigNumber = 42.into();
        let (ciphertext, rho) = pk.encrypt(&x, rng).unwrap();
        (
            Data { paillier_n: pk, ciphertext },
            PrivateData { x, rho },
            Aux { pedersen: trapdoor.params },
        )
    }

    #[test]
    fn honest_proof_verifies() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(20);
        let (data, witness, aux) = setup(&mut rng);
        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        verify::<DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).unwrap();
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(21);
        let (mut data, witness, aux) = setup(&mut rng);
        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        data.ciphertext = data.paillier_n.add(&data.ciphertext, &data.paillier_n.encrypt(&BigNumber::one(), &mut rng).unwrap().0);
        assert!(verify::<DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).is_err());
    }

    #[test]
    fn tampered_response_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(22);
        let (data, witness, aux) = setup(&mut rng);
        let mut proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        proof.z1 += 1;
        assert!(verify::<DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).is_err());
    }
}
