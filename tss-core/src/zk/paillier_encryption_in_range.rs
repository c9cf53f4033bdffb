//! Paillier encryption correctness proof: proves that a ciphertext `C`
//! encrypts the same value committed to by a (verifier-supplied) Pedersen
//! commitment `Cm`, without a fresh range claim of its own. Where
//! [`super::range_proof`] proves "this ciphertext's plaintext is small",
//! this proof proves "this ciphertext's plaintext is the one you already
//! committed to" — the shape MtA responders use to bind their Paillier
//! output back to a value the rest of a round already fixed.

use digest::Digest;
use key_share::security_level::SecurityLevel;
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};

use crate::paillier::PaillierPublicKey;
use crate::utils::sample_invertible;

use super::challenge::{InvalidProof, Transcript};
use super::{Aux, ProofSecurityLevel};

#[derive(Debug, Clone)]
pub struct Data {
    pub paillier_n: PaillierPublicKey,
    pub ciphertext: BigNumber,
    /// Pedersen commitment to the same plaintext, `Commit(x, mu)`, fixed by
    /// the caller ahead of time (e.g. published in an earlier round).
    pub commitment: BigNumber,
}

pub struct PrivateData {
    pub x: BigNumber,
    pub rho: BigNumber,
    pub mu: BigNumber,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Proof {
    a: BigNumber,
    d: BigNumber,
    z1: BigNumber,
    z2: BigNumber,
    z3: BigNumber,
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

    let gamma = BigNumber::from_rng(&(&alpha_bound * n_hat), rng);
    let alpha = BigNumber::from_rng(&alpha_bound, rng) - &alpha_bound / 2;
    let r = sample_invertible(&data.paillier_n.n, rng);

    let a = data
        .paillier_n
        .encrypt_with_randomness(&alpha, &r)
        .expect("alpha within plaintext range");
    let d = aux.pedersen.commit(&alpha, &gamma);

    let mut t = Transcript::<D>::new(sid);
    t.mix_bignumber(&data.paillier_n.n)
        .mix_bignumber(&data.ciphertext)
        .mix_bignumber(&data.commitment)
        .mix_bignumber(&a)
        .mix_bignumber(&d);
    let e = t.challenge_bignumber(L::Q_BITLEN) - (BigNumber::one() << (L::Q_BITLEN - 1));

    let z1 = &alpha + &e * &witness.x;
    let z2 = &r * witness.rho.modpow(&e, &data.paillier_n.n) % &data.paillier_n.n;
    let z3 = &gamma + &e * &witness.mu;

    Proof { a, d, z1, z2, z3 }
}

pub fn verify<L: SecurityLevel, D: Digest>(sid: &[u8], data: &Data, aux: &Aux, proof: &Proof) -> Result<(), InvalidProof> {
    let mut t = Transcript::<D>::new(sid);
    t.mix_bignumber(&data.paillier_n.n)
        .mix_bignumber(&data.ciphertext)
        .mix_bignumber(&data.commitment)
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
    let rhs2 = proof
        .d
        .modmul(&data.commitment.modpow(&e, &aux.pedersen.n), &aux.pedersen.n);
    if lhs2 != rhs2 {
        return Err(InvalidProof("pedersen commitment check failed"));
    }

    let bound = BigNumber::one() << (L::ELL + L::EPSILON);
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

        let x: BigNumber = 17.into();
        let (ciphertext, rho) = pk.encrypt(&x, rng).unwrap();
        let mu: BigNumber = BigNumber::from_rng(&trapdoor.params.n, rng);
        let commitment = trapdoor.params.commit(&x, &mu);
        (
            Data { paillier_n: pk, ciphertext, commitment },
            PrivateData { x, rho, mu },
            Aux { pedersen: trapdoor.params },
        )
    }

    #[test]
    fn honest_proof_verifies() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(40);
        let (data, witness, aux) = setup(&mut rng);
        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        verify::<DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).unwrap();
    }

    #[test]
    fn mismatched_commitment_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(41);
        let (mut data, witness, aux) = setup(&mut rng);
        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        data.commitment = aux.pedersen.commit(&BigNumber::from(99), &BigNumber::one());
        assert!(verify::<DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).is_err());
    }
}
