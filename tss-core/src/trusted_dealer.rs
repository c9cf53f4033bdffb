//! Fast, non-distributed mock key generation for tests and migrations.
//!
//! Runs the whole `(t, n)` sharing locally instead of as a multi-round
//! protocol: samples one Shamir polynomial per curve, derives every
//! party's share and Paillier/Pedersen auxiliary data directly. Grounded
//! on the teacher's `cggmp21::trusted_dealer::mock_keygen`, used by its own
//! test suite (`tests/src/bin/precompute_shares.rs`) to avoid running a
//! full DKG for every test case.
//!
//! Never reachable from production code paths: a real key must come from
//! running [`crate::threshold_ecdsa::keygen::Keygen`] or
//! [`crate::eddsa::keygen::Dkg`], since a trusted dealer is, by
//! construction, a single point that learns the whole secret.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar as EdScalar;
use generic_ec::{hash_to_curve::FromHash, Curve, Point, Scalar, SecretScalar};
use key_share::{
    eddsa::KeyShareEddsa, security_level::SecurityLevel, vss::Polynomial, IncompleteKeyShare, KeyShare, PartyAux, Valid,
};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::paillier::PreParams;
use crate::pedersen::PedersenTrapdoor;

fn eval_point<E: Curve>(k: u16) -> Scalar<E> {
    Scalar::<E>::from(u64::from(k) + 1)
}

/// Generates `n` complete ECDSA key shares for a `(t, n)` sharing of a
/// fresh random secret, each ready for signing immediately (own Paillier
/// keypair and every party's published auxiliary data already attached).
pub fn mock_keygen<E, L, R>(rng: &mut R, t: u16, n: u16) -> Result<Vec<Valid<KeyShare<E, L>>>, TrustedDealerError>
where
    E: Curve,
    L: SecurityLevel,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    if t == 0 || t > n {
        return Err(TrustedDealerError::InvalidThreshold);
    }

    let secret = Scalar::<E>::random(rng);
    let poly = Polynomial::sample(usize::from(t) - 1, secret, |rng| Scalar::<E>::random(rng), rng);
    let shared_public_key = Point::<E>::generator() * secret;

    let xs: Vec<Scalar<E>> = (0..n).map(|k| poly.evaluate(eval_point::<E>(k))).collect();
    let public_shares: Vec<Point<E>> = xs.iter().map(|x| Point::<E>::generator() * x).collect();

    let mut aux_private = Vec::with_capacity(usize::from(n));
    let mut parties = Vec::with_capacity(usize::from(n));
    for _ in 0..n {
        let preparams = PreParams::<L>::generate(rng);
        let (p, q) = preparams.split();
        let trapdoor = PedersenTrapdoor::generate(&p, &q, rng).map_err(|_| TrustedDealerError::DegenerateModulus)?;
        let mut y = Scalar::<E>::random(rng);
        let y_secret = SecretScalar::new(&mut y);
        let big_y = Point::<E>::generator() * y_secret.as_ref();
        parties.push(PartyAux {
            N: &p * &q,
            s: trapdoor.params.s.clone(),
            t: trapdoor.params.t.clone(),
            Y: big_y,
        });
        aux_private.push((p, q, y_secret));
    }

    let mut rid = L::Rid::default();
    rng.fill_bytes(rid.as_mut());

    let mut shares = Vec::with_capacity(usize::from(n));
    for i in 0..n {
        let (p, q, y) = aux_private[usize::from(i)].clone();
        let mut x_i = xs[usize::from(i)];
        let core = IncompleteKeyShare {
            i,
            shared_public_key,
            rid: rid.clone(),
            public_shares: public_shares.clone(),
            x: SecretScalar::new(&mut x_i),
        };
        let share = KeyShare {
            core,
            p,
            q,
            y,
            parties: parties.clone(),
            chain_code: None,
        };
        let share = Valid::try_from(share).map_err(|_| TrustedDealerError::BuiltShareInvalid)?;
        shares.push(share);
    }
    Ok(shares)
}

fn eddsa_eval_point(k: u16) -> EdScalar {
    EdScalar::from(u64::from(k) + 1)
}

/// EdDSA analog of [`mock_keygen`]: no Paillier/Pedersen auxiliary data is
/// needed since threshold EdDSA signing is purely additive.
pub fn mock_keygen_eddsa<R: RngCore + CryptoRng>(rng: &mut R, t: u16, n: u16) -> Result<Vec<KeyShareEddsa>, TrustedDealerError> {
    if t == 0 || t > n {
        return Err(TrustedDealerError::InvalidThreshold);
    }

    let mut secret_bytes = [0u8; 64];
    rng.fill_bytes(&mut secret_bytes);
    let secret = EdScalar::from_bytes_mod_order_wide(&secret_bytes);
    let poly = Polynomial::sample(
        usize::from(t) - 1,
        secret,
        |rng| {
            let mut bytes = [0u8; 64];
            rng.fill_bytes(&mut bytes);
            EdScalar::from_bytes_mod_order_wide(&bytes)
        },
        rng,
    );
    let shared_public_key = &secret * ED25519_BASEPOINT_TABLE;

    let xs: Vec<EdScalar> = (0..n).map(|k| poly.evaluate(eddsa_eval_point(k))).collect();
    let public_shares: Vec<EdwardsPoint> = xs.iter().map(|x| x * ED25519_BASEPOINT_TABLE).collect();

    let shares = (0..n)
        .map(|i| KeyShareEddsa {
            i,
            shared_public_key,
            public_shares: public_shares.clone(),
            x: xs[usize::from(i)],
            chain_code: None,
        })
        .collect();
    Ok(shares)
}

#[derive(Debug, Error)]
pub enum TrustedDealerError {
    #[error("threshold must be nonzero and at most the number of parties")]
    InvalidThreshold,
    #[error("generated paillier primes produced a degenerate pedersen modulus")]
    DegenerateModulus,
    #[error("share built from trusted-dealer data failed validation (internal bug)")]
    BuiltShareInvalid,
}

#[cfg(test)]
mod tests {
    use key_share::security_level::DevelopmentOnly;
    use rand_chacha::rand_core::SeedableRng;

    use super::*;
    use crate::supported_curves::Secp256k1;

    #[test]
    fn mock_shares_reconstruct_and_validate() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(11);
        let shares = mock_keygen::<Secp256k1, DevelopmentOnly, _>(&mut rng, 2, 3).unwrap();
        assert_eq!(shares.len(), 3);
        for s in &shares {
            assert!(s.validate().is_ok());
        }
        assert_eq!(shares[0].core.shared_public_key, shares[1].core.shared_public_key);
    }

    #[test]
    fn mock_eddsa_shares_validate() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(12);
        let shares = mock_keygen_eddsa(&mut rng, 2, 3).unwrap();
        assert_eq!(shares.len(), 3);
        for s in &shares {
            assert!(s.validate().is_ok());
        }
    }
}
