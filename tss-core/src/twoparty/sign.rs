//! Two-party ECDSA signing (spec §4.4's 3-round sign state machine).
//!
//! Round 1: both parties commit to a fresh nonce `k_i * G`, then open the
//! commitment together with a Schnorr proof of knowledge of `k_i`.
//! Round 2: P2, now holding `K1 = k1 * G`, computes `R = k2 * K1` locally
//! (no MPC needed: P2 alone knows `k2`) and `r = R.x mod q`, then sends
//! P1 the MtA-combined ciphertext `E(k2⁻¹·(m + r·x1·x2))`, blinded by a
//! random multiple of `q`.
//! Round 3: P1 decrypts, multiplies by `k1⁻¹`, reduces mod `q` to get `s`,
//! and verifies the assembled signature against the shared public key.

use digest::Digest;
use generic_ec::{hash_to_curve::FromHash, Curve, Point, Scalar, SecretScalar};
use generic_ec_zkp::{hash_commitment::{self, HashCommit}, schnorr_pok};
use key_share::{
    session::{OutMsg, Protocol, StepOutcome},
    twoparty::{KeyShareP1, KeyShareP2},
};
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::paillier::PaillierPublicKey;
use crate::utils::{bignumber_to_scalar, scalar_to_bignumber};

use super::Role;

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub enum Msg<E: Curve> {
    Commit(hash_commitment::CommitNonce),
    Open {
        point: Point<E>,
        decommit: hash_commitment::DecommitNonce<sha2::Sha256>,
        sch_commit: schnorr_pok::Commit<E>,
        proof: schnorr_pok::Proof<E>,
    },
    MtaContribution {
        r: Scalar<E>,
        ciphertext: BigNumber,
    },
    Ack,
}

/// Final signature, in the `(r, s)` form every ECDSA verifier expects.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Signature<E: Curve> {
    pub r: Scalar<E>,
    pub s: Scalar<E>,
}

pub enum Output<E: Curve> {
    P1(Signature<E>),
    P2,
}

enum KeyMaterial<E: Curve> {
    P1(KeyShareP1<E>),
    P2(KeyShareP2<E>),
}

pub struct Sign<E: Curve, R> {
    role: Role,
    rng: R,
    sid: Vec<u8>,
    message: Scalar<E>,
    key: KeyMaterial<E>,

    k: Option<Scalar<E>>,
    big_k: Option<Point<E>>,
    sch_secret: Option<schnorr_pok::Secret<E>>,
    sch_commit: Option<schnorr_pok::Commit<E>>,
    decommit: Option<hash_commitment::DecommitNonce<sha2::Sha256>>,
    peer_commitment: Option<hash_commitment::CommitNonce>,
    peer_point: Option<Point<E>>,

    r: Option<Scalar<E>>,
}

impl<E: Curve, R: RngCore + CryptoRng> Sign<E, R> {
    pub fn new_p1(sid: Vec<u8>, message: Scalar<E>, key: KeyShareP1<E>, rng: R) -> Self {
        Self::new(Role::P1, sid, message, KeyMaterial::P1(key), rng)
    }

    pub fn new_p2(sid: Vec<u8>, message: Scalar<E>, key: KeyShareP2<E>, rng: R) -> Self {
        Self::new(Role::P2, sid, message, KeyMaterial::P2(key), rng)
    }

    fn new(role: Role, sid: Vec<u8>, message: Scalar<E>, key: KeyMaterial<E>, rng: R) -> Self {
        Self {
            role,
            rng,
            sid,
            message,
            key,
            k: None,
            big_k: None,
            sch_secret: None,
            sch_commit: None,
            decommit: None,
            peer_commitment: None,
            peer_point: None,
            r: None,
        }
    }
}

impl<E, R> Protocol for Sign<E, R>
where
    E: Curve,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    type Message = Msg<E>;
    type Output = Output<E>;
    type Error = SignError;

    fn round_count(&self) -> u16 {
        3
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let k = Scalar::<E>::random(&mut self.rng);
        let big_k = Point::<E>::generator() * k;
        let (sch_secret, sch_commit) = schnorr_pok::prover_commits_ephemeral_secret::<E, _>(&mut self.rng);

        let (commitment, decommit) = HashCommit::<sha2::Sha256>::builder()
            .mix_bytes(&self.sid)
            .mix(self.role.index())
            .mix(big_k)
            .commit(&mut self.rng);

        self.k = Some(k);
        self.big_k = Some(big_k);
        self.sch_secret = Some(sch_secret);
        self.sch_commit = Some(sch_commit);
        self.decommit = Some(decommit);

        Ok(vec![OutMsg::broadcast(Msg::Commit(commitment))])
    }

    fn handle_round(
        &mut self,
        round: u16,
        messages: Vec<(u16, Self::Message)>,
    ) -> Result<StepOutcome<Self::Message, Self::Output>, Self::Error> {
        match round {
            0 => {
                let (_, msg) = messages.into_iter().next().ok_or(SignError::MissingPeerMessage)?;
                let Msg::Commit(commitment) = msg else {
                    return Err(SignError::UnexpectedMessage);
                };
                self.peer_commitment = Some(commitment);

                let point = self.big_k.expect("set in start");
                let decommit = self.decommit.clone().expect("set in start");
                let sch_commit = self.sch_commit.clone().expect("set in start");

                let challenge = self.schnorr_challenge(point)?;
                let sch_secret = self.sch_secret.as_ref().expect("set in start");
                let mut k = self.k.expect("set in start");
                let proof = schnorr_pok::prove(sch_secret, &challenge, &SecretScalar::new(&mut k));

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Open {
                    point,
                    decommit,
                    sch_commit,
                    proof,
                })]))
            }
            1 => {
                let (_, msg) = messages.into_iter().next().ok_or(SignError::MissingPeerMessage)?;
                let Msg::Open {
                    point,
                    decommit,
                    sch_commit,
                    proof,
                } = msg
                else {
                    return Err(SignError::UnexpectedMessage);
                };

                let peer_role_index = if self.role == Role::P1 { 1u16 } else { 0u16 };
                let commitment = self.peer_commitment.clone().expect("set in round 0");
                HashCommit::<sha2::Sha256>::builder()
                    .mix_bytes(&self.sid)
                    .mix(peer_role_index)
                    .mix(point)
                    .verify(&commitment, &decommit)
                    .map_err(|_| SignError::InvalidDecommitment)?;

                let challenge = self.schnorr_challenge(point)?;
                proof
                    .verify(&sch_commit, &challenge, &point)
                    .map_err(|_| SignError::InvalidSchnorrProof)?;
                self.peer_point = Some(point);

                let out = match (&self.role, &self.key) {
                    (Role::P2, KeyMaterial::P2(share)) => {
                        let k1_g = self.peer_point.expect("just set");
                        let k2 = self.k.expect("set in start");
                        let big_r = k1_g * k2;
                        let r = x_coordinate(&big_r);
                        self.r = Some(r);

                        let k2_inv = k2.invert().ok_or(SignError::ZeroNonce)?;
                        let x2 = share.x2.as_ref();
                        let alpha = k2_inv * self.message;
                        let beta = k2_inv * r * x2;

                        let pk = PaillierPublicKey { n: share.paillier_n.clone() };
                        let (enc_alpha, _) = pk
                            .encrypt(&scalar_to_bignumber(&alpha), &mut self.rng)
                            .map_err(|_| SignError::PaillierOp)?;
                        let beta_big = scalar_to_bignumber(&beta);
                        let term2 = pk.scalar_mul(&share.enc_x1, &beta_big);
                        let combined = pk.add(&enc_alpha, &term2);

                        // Statistical blinding: add an encryption of a
                        // random multiple of q, sampled so the blind itself
                        // is uniform up to ~N/2. P1 reduces the decrypted
                        // plaintext mod q before using it, which cancels
                        // this term exactly while preventing P1 from
                        // learning anything about `alpha`/`beta`
                        // individually from the unreduced plaintext.
                        let q = curve_order::<E>();
                        let blind_multiplier = BigNumber::from_rng(&((share.paillier_n.clone() >> 1) / &q), &mut self.rng);
                        let blind = blind_multiplier * &q;
                        let (enc_blind, _) = pk.encrypt(&blind, &mut self.rng).map_err(|_| SignError::PaillierOp)?;
                        let ciphertext = pk.add(&combined, &enc_blind);

                        Msg::MtaContribution { r, ciphertext }
                    }
                    (Role::P1, KeyMaterial::P1(_)) => Msg::Ack,
                    _ => return Err(SignError::UnexpectedMessage),
                };

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(out)]))
            }
            2 => {
                let (_, msg) = messages.into_iter().next().ok_or(SignError::MissingPeerMessage)?;

                let output = match (&self.role, &self.key, msg) {
                    (Role::P1, KeyMaterial::P1(share), Msg::MtaContribution { r, ciphertext }) => {
                        let sk = crate::paillier::PaillierPrivateKey::from_primes(
                            share.paillier_p.clone(),
                            share.paillier_q.clone(),
                        )
                        .map_err(|_| SignError::PaillierOp)?;
                        let decrypted = sk.decrypt(&ciphertext).map_err(|_| SignError::PaillierOp)?;
                        let s0 = bignumber_to_scalar::<E>(&decrypted);

                        let k1 = self.k.expect("set in start");
                        let k1_inv = k1.invert().ok_or(SignError::ZeroNonce)?;
                        let mut s = k1_inv * s0;
                        if is_high_s::<E>(&s) {
                            s = -s;
                        }

                        let y = share.shared_public_key;
                        verify_ecdsa::<E>(self.message, r, s, y).map_err(|_| SignError::SignatureInvalid)?;

                        Output::P1(Signature { r, s })
                    }
                    (Role::P2, KeyMaterial::P2(_), Msg::Ack) => Output::P2,
                    _ => return Err(SignError::UnexpectedMessage),
                };

                Ok(StepOutcome::Done(output))
            }
            _ => Err(SignError::UnexpectedMessage),
        }
    }
}

impl<E: Curve, R> Sign<E, R>
where
    Scalar<E>: FromHash,
{
    fn schnorr_challenge(&self, point: Point<E>) -> Result<schnorr_pok::Challenge<E>, SignError> {
        let tag = generic_ec::hash_to_curve::Tag::new(&self.sid).ok_or(SignError::InvalidTag)?;
        let nonce = Scalar::<E>::hash_concat(
            tag,
            &[&self.role.index().to_be_bytes(), point.to_bytes(true).as_ref()],
        )
        .map_err(|_| SignError::HashToScalar)?;
        Ok(schnorr_pok::Challenge { nonce })
    }
}

pub(crate) fn x_coordinate<E: Curve>(point: &Point<E>) -> Scalar<E> {
    let bytes = point.to_bytes(true);
    let x_bytes = &bytes.as_ref()[1..];
    Scalar::<E>::from_be_bytes_mod_order(x_bytes)
}

/// Recovers the curve's group order as a `BigNumber` without a dedicated
/// API for it: `q - 1`, canonically encoded, is exactly
/// `scalar_to_bignumber(&(Scalar::zero() - Scalar::one()))`.
pub(crate) fn curve_order<E: Curve>() -> BigNumber {
    let neg_one = Scalar::<E>::zero() - Scalar::<E>::from(1);
    scalar_to_bignumber(&neg_one) + 1
}

/// ECDSA low-s normalization: `s` and `q - s` both verify, so signatures
/// are canonicalized to the smaller of the two to avoid malleability.
/// `q - s` is exactly `-s` in the scalar field, so comparing the two
/// canonical encodings directly avoids needing `q` here too.
pub(crate) fn is_high_s<E: Curve>(s: &Scalar<E>) -> bool {
    scalar_to_bignumber(s) > scalar_to_bignumber(&(-*s))
}

/// Standard ECDSA verification equation, exposed so callers (and tests) can
/// check a signature assembled from a [`Signature`] against a known public
/// key without depending on an external ECDSA crate.
pub fn verify_ecdsa<E: Curve>(message: Scalar<E>, r: Scalar<E>, s: Scalar<E>, y: Point<E>) -> Result<(), ()> {
    let s_inv = s.invert().ok_or(())?;
    let u1 = message * s_inv;
    let u2 = r * s_inv;
    let point = Point::<E>::generator() * u1 + y * u2;
    if x_coordinate(&point) == r {
        Ok(())
    } else {
        Err(())
    }
}

#[derive(Debug, Error)]
pub enum SignError {
    #[error("a nonce reduced to zero; retry with fresh randomness")]
    ZeroNonce,
    #[error("peer's decommitment doesn't match the earlier commitment")]
    InvalidDecommitment,
    #[error("peer's schnorr proof of knowledge of its nonce is invalid")]
    InvalidSchnorrProof,
    #[error("paillier operation failed")]
    PaillierOp,
    #[error("assembled signature failed to verify against the shared public key")]
    SignatureInvalid,
    #[error("hash-to-curve tag could not be built from session id")]
    InvalidTag,
    #[error("hash-to-scalar failed")]
    HashToScalar,
    #[error("expected exactly one peer message this round")]
    MissingPeerMessage,
    #[error("unexpected message variant for this round/role")]
    UnexpectedMessage,
}
