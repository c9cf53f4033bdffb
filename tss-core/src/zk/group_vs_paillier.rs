//! Group-element vs Paillier-encryption range proof (Π_log*): proves a
//! Paillier ciphertext `C` encrypts the same value `x` that is also exposed
//! in the exponent as a curve point `Y = x * G`, and that `x` lies in
//! `[0, 2^L]`. Used to bind an ECDSA signing nonce (or MtA contribution) to
//! its public commitment.
//!
//! Grounded directly on the retrieved `group_element_vs_paillier_encryption`
//! proof from the pack's Paillier-ZK reference implementation, adapted to
//! this crate's `PaillierPublicKey`/`Aux` types.

use digest::Digest;
use generic_ec::{Curve, Point};
use key_share::security_level::SecurityLevel;
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};

use crate::paillier::PaillierPublicKey;
use crate::utils::sample_invertible;

use super::challenge::{InvalidProof, Transcript};
use super::{Aux, ProofSecurityLevel};

#[derive(Debug, Clone)]
pub struct Data<E: Curve> {
    pub paillier_n: PaillierPublicKey,
    pub ciphertext: BigNumber,
    pub x_public: Point<E>,
}

pub struct PrivateData {
    pub x: BigNumber,
    pub rho: BigNumber,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct Proof<E: Curve> {
    s: BigNumber,
    a: BigNumber,
    y: Point<E>,
    d: BigNumber,
    z1: BigNumber,
    z2: BigNumber,
    z3: BigNumber,
}

pub fn prove<E: Curve, L: SecurityLevel, D: Digest, R: RngCore + CryptoRng>(
    sid: &[u8],
    data: &Data<E>,
    witness: &PrivateData,
    aux: &Aux,
    rng: &mut R,
) -> Proof<E> {
    use generic_ec::{Point as P, Scalar};

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
        .expect("alpha within plaintext range");
    let alpha_scalar = Scalar::<E>::from_be_bytes_mod_order(&alpha.to_bytes());
    let y = P::<E>::generator() * alpha_scalar;
    let d = aux.pedersen.commit(&alpha, &gamma);

    let mut t = Transcript::<D>::new(sid);
    t.mix_bignumber(&data.paillier_n.n)
        .mix_bignumber(&data.ciphertext)
        .mix_point(&data.x_public)
        .mix_bignumber(&s)
        .mix_bignumber(&a)
        .mix_point(&y)
        .mix_bignumber(&d);
    let e = t.challenge_bignumber(L::Q_BITLEN) - (BigNumber::one() << (L::Q_BITLEN - 1));

    let z1 = &alpha + &e * &witness.x;
    let z2 = &r * witness.rho.modpow(&e, &data.paillier_n.n) % &data.paillier_n.n;
    let z3 = &gamma + &e * &mu;

    Proof { s, a, y, d, z1, z2, z3 }
}

pub fn verify<E: Curve, L: SecurityLevel, D: Digest>(
    sid: &[u8],
    data: &Data<E>,
    aux: &Aux,
    proof: &Proof<E>,
) -> Result<(), InvalidProof> {
    use generic_ec::{Point as P, Scalar};

    let mut t = Transcript::<D>::new(sid);
    t.mix_bignumber(&data.paillier_n.n)
        .mix_bignumber(&data.ciphertext)
        .mix_point(&data.x_public)
        .mix_bignumber(&proof.s)
        .mix_bignumber(&proof.a)
        .mix_point(&proof.y)
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

    let z1_scalar = Scalar::<E>::from_be_bytes_mod_order(&proof.z1.to_bytes());
    let e_scalar = Scalar::<E>::from_be_bytes_mod_order(&e.to_bytes());
    let expected_y = P::<E>::generator() * z1_scalar;
    let got_y = proof.y + data.x_public * e_scalar;
    if expected_y != got_y {
        return Err(InvalidProof("group-element side-statement check failed"));
    }

    let lhs2 = aux.pedersen.commit(&proof.z1, &proof.z3);
    let rhs2 = proof.d.modmul(&proof.s.modpow(&e, &aux.pedersen.n), &aux.pedersen.n);
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
    use generic_ec::Scalar;
    use key_share::security_level::DevelopmentOnly;
    use rand_chacha::rand_core::SeedableRng;
    use sha2::Sha256;
    use crate::supported_curves::Secp256k1;

    fn setup(rng: &mut rand_chacha::ChaCha20Rng) -> (Data<Secp256k1>, PrivateData, Aux) {
        let prep = crate::paillier::PreParams::<DevelopmentOnly>::generate(rng);
        let (p, q) = prep.split();
        let sk = crate::paillier::PaillierPrivateKey::from_primes(p.clone(), q.clone()).unwrap();
        let pk = sk.public_key();
        let trapdoor = crate::pedersen::PedersenTrapdoor::generate(&p, &q, rng).unwrap();

        let x: BigNumber = 7.into();
        let (ciphertext, rho) = pk.encrypt(&x, rng).unwrap();
        let x_scalar = Scalar::<Secp256k1>::from_be_bytes_mod_order(&x.to_bytes());
        let x_public = generic_ec::Point::<Secp256k1>::generator() * x_scalar;
        (
            Data { paillier_n: pk, ciphertext, x_public },
            PrivateData { x, rho },
            Aux { pedersen: trapdoor.params },
        )
    }

    #[test]
    fn honest_proof_verifies() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(30);
        let (data, witness, aux) = setup(&mut rng);
        let proof = prove::<Secp256k1, DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        verify::<Secp256k1, DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).unwrap();
    }

    #[test]
    fn mismatched_group_element_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(31);
        let (mut data, witness, aux) = setup(&mut rng);
        let proof = prove::<Secp256k1, DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        data.x_public = data.x_public + generic_ec::Point::<Secp256k1>::generator();
        assert!(verify::<Secp256k1, DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).is_err());
    }

    #[test]
    fn tampered_response_is_rejected() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(32);
        let (data, witness, aux) = setup(&mut rng);
        let mut proof = prove::<Secp256k1, DevelopmentOnly, Sha256, _>(b"sid", &data, &witness, &aux, &mut rng);
        proof.z1 += 1;
        assert!(verify::<Secp256k1, DevelopmentOnly, Sha256>(b"sid", &data, &aux, &proof).is_err());
    }
}
