//! Threshold EdDSA (ed25519) signing: a commit-reveal combination of
//! per-party nonces followed by a single Schnorr-style response, run over
//! the signing subset's Lagrange-weighted shares. No Paillier/MtA is
//! needed here (unlike the ECDSA side) because EdDSA's signing equation is
//! linear in the nonce, so the additive shares combine directly.
//!
//! Produces a standard RFC 8032 `(R, s)` signature — challenged with
//! SHA-512 over `R || A || M` exactly as a single-signer Ed25519 would be —
//! so the result verifies against any off-the-shelf Ed25519 verifier, not
//! just this crate's own.

use std::marker::PhantomData;

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use digest::Digest;
use ed25519_dalek::{Signature, VerifyingKey};
use key_share::{
    eddsa::KeyShareEddsa,
    session::{OutMsg, Protocol, StepOutcome},
    vss,
};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha512;
use thiserror::Error;

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub enum Msg {
    Round1(MsgRound1),
    Round2(MsgRound2),
    Round3(MsgRound3),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound1 {
    commitment: Vec<u8>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound2 {
    #[serde(with = "key_share::eddsa::point_serde")]
    big_r: EdwardsPoint,
    nonce: [u8; 32],
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound3 {
    #[serde(with = "key_share::eddsa::scalar_serde")]
    sigma: Scalar,
}

fn eval_point(k: u16) -> Scalar {
    Scalar::from(u64::from(k) + 1)
}

fn commitment_hash<D: Digest>(sid: &[u8], i: u16, big_r: &EdwardsPoint, nonce: &[u8; 32]) -> Vec<u8> {
    let mut h = D::new();
    h.update(sid);
    h.update(i.to_be_bytes());
    h.update(big_r.compress().to_bytes());
    h.update(nonce);
    h.finalize().to_vec()
}

/// Driving state of threshold EdDSA signing for one local party.
pub struct Sign<D, R> {
    i: u16,
    subset: Vec<u16>,
    pos: usize,
    share: KeyShareEddsa,
    message: Vec<u8>,
    sid: Vec<u8>,
    rng: R,
    w_i: Scalar,

    r_i: Option<Scalar>,
    nonce: Option<[u8; 32]>,
    peer_commitments: Vec<Option<Vec<u8>>>,
    peer_big_r: Vec<Option<EdwardsPoint>>,
    peer_sigma: Vec<Option<Scalar>>,
    challenge: Option<Scalar>,
    combined_r: Option<EdwardsPoint>,

    _d: PhantomData<D>,
}

impl<D, R> Sign<D, R>
where
    D: Digest,
    R: RngCore + CryptoRng,
{
    /// `subset` is the ascending list of global party indices taking part
    /// in this signing operation (size `t`, must include `share.i`).
    pub fn new(share: KeyShareEddsa, subset: Vec<u16>, message: Vec<u8>, sid: Vec<u8>, rng: R) -> Result<Self, SignError> {
        let i = share.i;
        let pos = subset.iter().position(|&k| k == i).ok_or(SignError::NotInSubset)?;
        let eval_points: Vec<Scalar> = subset.iter().map(|&k| eval_point(k)).collect();
        let w_i = vss::lagrange_coefficient(&eval_points, eval_point(i)).ok_or(SignError::DegenerateSubset)? * share.x;

        let t = subset.len();
        Ok(Self {
            i,
            subset,
            pos,
            share,
            message,
            sid,
            rng,
            w_i,
            r_i: None,
            nonce: None,
            peer_commitments: vec![None; t],
            peer_big_r: vec![None; t],
            peer_sigma: vec![None; t],
            challenge: None,
            combined_r: None,
            _d: PhantomData,
        })
    }

    fn pos_of(&self, global: u16) -> Result<usize, SignError> {
        self.subset.iter().position(|&k| k == global).ok_or(SignError::MissingMessage { sender: global })
    }
}

impl<D, R> Protocol for Sign<D, R>
where
    D: Digest + Clone,
    R: RngCore + CryptoRng,
{
    type Message = Msg;
    type Output = Signature;
    type Error = SignError;

    fn round_count(&self) -> u16 {
        2
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let mut bytes = [0u8; 64];
        self.rng.fill_bytes(&mut bytes);
        let r_i = Scalar::from_bytes_mod_order_wide(&bytes);
        let big_r_i = &r_i * ED25519_BASEPOINT_TABLE;

        let mut nonce = [0u8; 32];
        self.rng.fill_bytes(&mut nonce);
        let commitment = commitment_hash::<D>(&self.sid, self.i, &big_r_i, &nonce);

        self.r_i = Some(r_i);
        self.nonce = Some(nonce);
        self.peer_big_r[self.pos] = Some(big_r_i);

        Ok(vec![OutMsg::broadcast(Msg::Round1(MsgRound1 { commitment }))])
    }

    fn handle_round(
        &mut self,
        round: u16,
        messages: Vec<(u16, Self::Message)>,
    ) -> Result<StepOutcome<Self::Message, Self::Output>, Self::Error> {
        match round {
            0 => {
                for (j, msg) in messages {
                    let Msg::Round1(m) = msg else {
                        return Err(SignError::UnexpectedMessage);
                    };
                    let pos_j = self.pos_of(j)?;
                    self.peer_commitments[pos_j] = Some(m.commitment);
                }

                let big_r_i = self.peer_big_r[self.pos].expect("set in start");
                let nonce = self.nonce.expect("set in start");

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round2(MsgRound2 {
                    big_r: big_r_i,
                    nonce,
                }))]))
            }
            1 => {
                for (j, msg) in messages {
                    let Msg::Round2(m) = msg else {
                        return Err(SignError::UnexpectedMessage);
                    };
                    let pos_j = self.pos_of(j)?;
                    let commitment = self.peer_commitments[pos_j].clone().ok_or(SignError::MissingMessage { sender: j })?;
                    let expected = commitment_hash::<D>(&self.sid, j, &m.big_r, &m.nonce);
                    if expected != commitment {
                        return Err(SignError::InvalidDecommitment { sender: j });
                    }
                    self.peer_big_r[pos_j] = Some(m.big_r);
                }

                let combined_r: EdwardsPoint = self
                    .peer_big_r
                    .iter()
                    .fold(EdwardsPoint::identity(), |acc, p| acc + p.expect("collected above"));
                let challenge = hash_challenge(&combined_r, &self.share.shared_public_key, &self.message);

                let sigma_i = self.r_i.expect("set in start") + challenge * self.w_i;
                self.combined_r = Some(combined_r);
                self.challenge = Some(challenge);
                self.peer_sigma[self.pos] = Some(sigma_i);

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round3(MsgRound3 {
                    sigma: sigma_i,
                }))]))
            }
            2 => {
                for (j, msg) in messages {
                    let Msg::Round3(m) = msg else {
                        return Err(SignError::UnexpectedMessage);
                    };
                    let pos_j = self.pos_of(j)?;
                    self.peer_sigma[pos_j] = Some(m.sigma);
                }

                let s: Scalar = self.peer_sigma.iter().map(|s| s.expect("collected above")).sum();
                let big_r = self.combined_r.expect("set above");

                let mut sig_bytes = [0u8; 64];
                sig_bytes[..32].copy_from_slice(big_r.compress().as_bytes());
                sig_bytes[32..].copy_from_slice(s.as_bytes());
                let signature = Signature::from_bytes(&sig_bytes);

                let verifying_key = VerifyingKey::from_bytes(self.share.shared_public_key.compress().as_bytes())
                    .map_err(|_| SignError::InvalidPublicKey)?;
                verifying_key
                    .verify_strict(&self.message, &signature)
                    .map_err(|_| SignError::SignatureInvalid)?;

                Ok(StepOutcome::Done(signature))
            }
            _ => Err(SignError::UnexpectedMessage),
        }
    }
}

/// RFC 8032's per-signature challenge, `SHA512(R || A || M) mod L`.
fn hash_challenge(big_r: &EdwardsPoint, public_key: &EdwardsPoint, message: &[u8]) -> Scalar {
    let mut h = Sha512::new();
    h.update(big_r.compress().as_bytes());
    h.update(public_key.compress().as_bytes());
    h.update(message);
    let digest = h.finalize();
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

#[derive(Debug, Error)]
pub enum SignError {
    #[error("local party is not a member of the declared signing subset")]
    NotInSubset,
    #[error("signing subset is degenerate (duplicate evaluation points)")]
    DegenerateSubset,
    #[error("missing message from party {sender}")]
    MissingMessage { sender: u16 },
    #[error("peer {sender}'s decommitment doesn't match the earlier commitment")]
    InvalidDecommitment { sender: u16 },
    #[error("shared public key is not a valid ed25519 verifying key")]
    InvalidPublicKey,
    #[error("assembled signature failed to verify against the shared public key")]
    SignatureInvalid,
    #[error("unexpected message variant for this round")]
    UnexpectedMessage,
}
