//! Threshold EdDSA (ed25519) key generation: the same Feldman-VSS DKG shape
//! as `threshold_keygen::Dkg`, re-expressed directly over
//! `curve25519_dalek` types since that crate's Edwards group isn't a
//! `generic_ec::Curve` and so can't go through the generic DKG. Shares the
//! `key_share::vss` polynomial/Lagrange math with the ECDSA side; only the
//! curve arithmetic and the commit-reveal primitive (plain SHA-2 here
//! instead of `generic_ec_zkp::hash_commitment`, which is generic-ec-only)
//! differ.
//!
//! Round shape:
//! 1. Sample a degree-`t-1` polynomial; broadcast a hash commitment to its
//!    Feldman commitments.
//! 2. Open the commitment.
//! 3. Send every peer its private Shamir share (p2p).
//! 4. Broadcast a Schnorr proof of knowledge of the resulting share.

use std::marker::PhantomData;

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use digest::Digest;
use key_share::{
    eddsa::KeyShareEddsa,
    session::{OutMsg, Protocol, StepOutcome},
    vss::Polynomial,
};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::zk::schnorr::eddsa as schnorr;

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub enum Msg {
    Round1(MsgRound1),
    Round2(MsgRound2),
    Round3(MsgRound3),
    Round4(MsgRound4),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound1 {
    commitment: Vec<u8>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound2 {
    #[serde(with = "key_share::eddsa::points_serde")]
    feldman_commitments: Vec<EdwardsPoint>,
    nonce: [u8; 32],
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound3 {
    #[serde(with = "key_share::eddsa::scalar_serde")]
    share: Scalar,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MsgRound4 {
    proof: schnorr::Proof,
}

struct Opening {
    feldman_commitments: Vec<EdwardsPoint>,
}

fn eval_point(k: u16) -> Scalar {
    Scalar::from(u64::from(k) + 1)
}

fn evaluate_in_exponent(commitments: &[EdwardsPoint], x: Scalar) -> EdwardsPoint {
    let mut acc = EdwardsPoint::identity();
    for c in commitments.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

fn point_bytes(commitments: &[EdwardsPoint]) -> Vec<u8> {
    commitments.iter().flat_map(|p| p.compress().to_bytes()).collect()
}

fn commitment_hash<D: Digest>(sid: &[u8], n: u16, i: u16, feldman: &[EdwardsPoint], nonce: &[u8; 32]) -> Vec<u8> {
    let mut h = D::new();
    h.update(sid);
    h.update(n.to_be_bytes());
    h.update(i.to_be_bytes());
    h.update(point_bytes(feldman));
    h.update(nonce);
    h.finalize().to_vec()
}

/// Driving state of the EdDSA DKG for one local party.
pub struct Dkg<D, R> {
    i: u16,
    n: u16,
    t: u16,
    rng: R,
    sid: Vec<u8>,
    fixed_constant_term: Option<Scalar>,

    polynomial: Option<Polynomial<Scalar>>,
    nonce: Option<[u8; 32]>,

    peer_commitments: Vec<Option<Vec<u8>>>,
    openings: Vec<Option<Opening>>,
    shares: Vec<Option<Scalar>>,
    x_i: Option<Scalar>,

    _d: PhantomData<D>,
}

impl<D, R> Dkg<D, R>
where
    D: Digest + Clone,
    R: RngCore + CryptoRng,
{
    pub fn new(i: u16, n: u16, t: u16, sid: Vec<u8>, rng: R) -> Self {
        Self {
            i,
            n,
            t,
            rng,
            sid,
            fixed_constant_term: None,
            polynomial: None,
            nonce: None,
            peer_commitments: vec![None; usize::from(n)],
            openings: (0..n).map(|_| None).collect(),
            shares: vec![None; usize::from(n)],
            x_i: None,
            _d: PhantomData,
        }
    }

    /// Reshare variant: see `threshold_keygen::Dkg::new_with_constant_term`.
    pub fn new_with_constant_term(i: u16, n: u16, t: u16, sid: Vec<u8>, constant_term: Scalar, rng: R) -> Self {
        let mut this = Self::new(i, n, t, sid, rng);
        this.fixed_constant_term = Some(constant_term);
        this
    }
}

impl<D, R> Protocol for Dkg<D, R>
where
    D: Digest + Clone,
    R: RngCore + CryptoRng,
{
    type Message = Msg;
    type Output = KeyShareEddsa;
    type Error = DkgError;

    fn round_count(&self) -> u16 {
        3
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let constant_term = self.fixed_constant_term.unwrap_or_else(|| random_scalar(&mut self.rng));
        let poly = Polynomial::sample(usize::from(self.t) - 1, constant_term, |rng| random_scalar(rng), &mut self.rng);
        let feldman_commitments: Vec<EdwardsPoint> = poly.coeffs.iter().map(|a| a * ED25519_BASEPOINT_TABLE).collect();

        let mut nonce = [0u8; 32];
        self.rng.fill_bytes(&mut nonce);
        let commitment = commitment_hash::<D>(&self.sid, self.n, self.i, &feldman_commitments, &nonce);

        self.openings[usize::from(self.i)] = Some(Opening {
            feldman_commitments: feldman_commitments.clone(),
        });
        self.polynomial = Some(poly);
        self.nonce = Some(nonce);

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
                        return Err(DkgError::UnexpectedMessage { round, sender: j });
                    };
                    self.peer_commitments[usize::from(j)] = Some(m.commitment);
                }

                let feldman_commitments = self.openings[usize::from(self.i)]
                    .as_ref()
                    .expect("set in start")
                    .feldman_commitments
                    .clone();
                let nonce = self.nonce.expect("set in start");

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round2(MsgRound2 {
                    feldman_commitments,
                    nonce,
                }))]))
            }
            1 => {
                for (j, msg) in messages {
                    let Msg::Round2(m) = msg else {
                        return Err(DkgError::UnexpectedMessage { round, sender: j });
                    };
                    let commitment = self.peer_commitments[usize::from(j)]
                        .clone()
                        .ok_or(DkgError::MissingCommitment { sender: j })?;
                    let expected = commitment_hash::<D>(&self.sid, self.n, j, &m.feldman_commitments, &m.nonce);
                    if expected != commitment {
                        return Err(DkgError::InvalidDecommitment { sender: j });
                    }
                    if m.feldman_commitments.len() != usize::from(self.t) {
                        return Err(DkgError::WrongDegree { sender: j });
                    }
                    self.openings[usize::from(j)] = Some(Opening {
                        feldman_commitments: m.feldman_commitments,
                    });
                }

                let poly = self.polynomial.as_ref().expect("set in start");
                let mut out = Vec::with_capacity(usize::from(self.n) - 1);
                for j in 0..self.n {
                    if j == self.i {
                        continue;
                    }
                    let share = poly.evaluate(eval_point(j));
                    out.push(OutMsg::p2p(j, Msg::Round3(MsgRound3 { share })));
                }
                self.shares[usize::from(self.i)] = Some(poly.evaluate(eval_point(self.i)));

                Ok(StepOutcome::Continue(out))
            }
            2 => {
                for (j, msg) in messages {
                    let Msg::Round3(m) = msg else {
                        return Err(DkgError::UnexpectedMessage { round, sender: j });
                    };
                    let opening = self.openings[usize::from(j)]
                        .as_ref()
                        .ok_or(DkgError::MissingCommitment { sender: j })?;
                    let expected = evaluate_in_exponent(&opening.feldman_commitments, eval_point(self.i));
                    if &m.share * ED25519_BASEPOINT_TABLE != expected {
                        return Err(DkgError::InvalidShare { sender: j });
                    }
                    self.shares[usize::from(j)] = Some(m.share);
                }

                let x_i: Scalar = self.shares.iter().map(|s| s.expect("all shares received by now")).sum();
                self.x_i = Some(x_i);

                let public = &x_i * ED25519_BASEPOINT_TABLE;
                let proof = schnorr::prove::<D, _>(&self.sid, &x_i, &public, &mut self.rng);

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round4(MsgRound4 { proof }))]))
            }
            3 => {
                for (j, msg) in messages {
                    let Msg::Round4(m) = msg else {
                        return Err(DkgError::UnexpectedMessage { round, sender: j });
                    };
                    let x_j_public = self.public_share_of(j)?;
                    if schnorr::verify::<D>(&self.sid, &x_j_public, &m.proof).is_err() {
                        return Err(DkgError::InvalidSchnorrProof { sender: j });
                    }
                }

                let public_shares: Vec<EdwardsPoint> = (0..self.n).map(|k| self.public_share_of(k)).collect::<Result<_, _>>()?;
                let shared_public_key = public_shares.iter().copied().sum();
                let x_i = self.x_i.expect("computed in round 2");

                Ok(StepOutcome::Done(KeyShareEddsa {
                    i: self.i,
                    shared_public_key,
                    public_shares,
                    x: x_i,
                    chain_code: None,
                }))
            }
            _ => Err(DkgError::UnexpectedMessage { round, sender: u16::MAX }),
        }
    }
}

impl<D, R> Dkg<D, R> {
    fn public_share_of(&self, k: u16) -> Result<EdwardsPoint, DkgError> {
        let x = eval_point(k);
        let mut acc = EdwardsPoint::identity();
        for j in 0..self.n {
            let opening = self.openings[usize::from(j)]
                .as_ref()
                .ok_or(DkgError::MissingCommitment { sender: j })?;
            acc += evaluate_in_exponent(&opening.feldman_commitments, x);
        }
        Ok(acc)
    }
}

fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

#[derive(Debug, Error)]
pub enum DkgError {
    #[error("unexpected message for round {round} from party {sender}")]
    UnexpectedMessage { round: u16, sender: u16 },
    #[error("missing commitment from party {sender}")]
    MissingCommitment { sender: u16 },
    #[error("decommitment doesn't match commitment from party {sender}")]
    InvalidDecommitment { sender: u16 },
    #[error("party {sender} published a polynomial of the wrong degree")]
    WrongDegree { sender: u16 },
    #[error("share from party {sender} doesn't match their feldman commitments")]
    InvalidShare { sender: u16 },
    #[error("schnorr proof of knowledge from party {sender} is invalid")]
    InvalidSchnorrProof { sender: u16 },
}
