//! Threshold ECDSA presigning: the MtA-based round that turns a `(t, n)`
//! key share into a per-party nonce contribution and `r`, without yet
//! touching the message being signed.
//!
//! Grounded on the teacher's GG18-style online-signing phase: every pair of
//! parties in the signing subset runs a Paillier-based multiplicative-to-
//! additive (MtA) share conversion, once against each other's `gamma_j` (to
//! jointly derive `r`) and once against each other's Lagrange-weighted key
//! share `w_j` (to derive the multiplicative mask `chi_i` used in the final
//! signing equation). As in the two-party sign round, the MtA responses
//! aren't separately zero-knowledge proved correct — [`super::sign`]'s
//! signature verification step is the final correctness check, same
//! simplification the two-party protocol already makes — but the nonce
//! ciphertext each party starts from *is* range-proved (Π_enc) against
//! every other signer's own Pedersen parameters, mirroring how the aux-info
//! round in [`super::keygen`] tailors one proof per verifier.
//!
//! Message-dependent finishing is deliberately *not* part of this state
//! machine: computing `sigma_i = m * k_i + r * chi_i` and combining
//! `s = sum(sigma_i)` is cheap, local, and needs exactly one more broadcast
//! round, so it's exposed as plain functions ([`sigma_contribution`],
//! [`combine_signature`]) rather than a second session type.

use std::marker::PhantomData;

use digest::Digest;
use generic_ec::{Curve, Point, Scalar};
use generic_ec_zkp::hash_commitment::{self, HashCommit};
use key_share::{
    security_level::SecurityLevel,
    session::{OutMsg, Protocol, StepOutcome},
    vss, KeyShare, Valid,
};
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::paillier::{PaillierPrivateKey, PaillierPublicKey};
use crate::twoparty::sign::{is_high_s, verify_ecdsa, x_coordinate};
use crate::utils::{bignumber_to_scalar, scalar_to_bignumber};
use crate::zk::{range_proof, Aux};
use crate::pedersen::PedersenParameters;

/// Final signature, in the `(r, s)` form every ECDSA verifier expects.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Signature<E: Curve> {
    pub r: Scalar<E>,
    pub s: Scalar<E>,
}

/// Output of the presign phase: everything one party needs to contribute
/// its share of a signature once the message is known.
#[derive(Clone)]
pub struct Presignature<E: Curve> {
    pub r: Scalar<E>,
    pub big_r: Point<E>,
    k_i: Scalar<E>,
    chi_i: Scalar<E>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub enum Msg<E: Curve, D: Digest> {
    Round1(MsgRound1<D>),
    Round2(MsgRound2<E, D>),
    Round3(MsgRound3<E>),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound1<D: Digest> {
    enc_k: BigNumber,
    commitment: HashCommit<D>,
    /// One range proof per peer, tailored to that peer's own Pedersen
    /// parameters (the verifier's aux, never the prover's).
    range_proofs: Vec<(u16, range_proof::Proof)>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound2<E: Curve, D: Digest> {
    big_gamma: Point<E>,
    decommit: hash_commitment::DecommitNonce<D>,
    /// MtA responses for every peer, each a pair of ciphertexts
    /// (gamma-term, w-term) encrypted under *that peer's* Paillier key.
    mta_responses: Vec<(u16, BigNumber, BigNumber)>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound3<E: Curve> {
    delta: Scalar<E>,
}

/// Driving state of the presign round for one local party.
pub struct Presign<E: Curve, L: SecurityLevel, D: Digest, R> {
    i: u16,
    subset: Vec<u16>,
    pos: usize,
    share: Valid<KeyShare<E, L>>,
    sid: Vec<u8>,
    rng: R,

    w_i: Scalar<E>,
    k_i: Option<Scalar<E>>,
    gamma_i: Option<Scalar<E>>,
    paillier_sk: Option<PaillierPrivateKey>,

    decommit: Option<hash_commitment::DecommitNonce<D>>,
    big_gamma_i: Option<Point<E>>,

    peer_commitments: Vec<Option<HashCommit<D>>>,
    peer_enc_k: Vec<Option<BigNumber>>,
    peer_big_gamma: Vec<Option<Point<E>>>,
    /// My own blinding values used when *responding* to each peer's MtA
    /// request; subtracted locally to form my additive share.
    beta_gamma: Vec<Option<BigNumber>>,
    beta_w: Vec<Option<BigNumber>>,
    /// Decrypted MtA shares addressed to me.
    alpha_gamma: Vec<Option<Scalar<E>>>,
    alpha_w: Vec<Option<Scalar<E>>>,
    peer_delta: Vec<Option<Scalar<E>>>,

    _l: PhantomData<L>,
}

impl<E, L, D, R> Presign<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
{
    /// `subset` is the ascending list of global party indices taking part
    /// in this signing operation (size `t`, must include `share.core.i`).
    pub fn new(share: Valid<KeyShare<E, L>>, subset: Vec<u16>, sid: Vec<u8>, rng: R) -> Result<Self, SignError> {
        let i = share.core.i;
        let pos = subset
            .iter()
            .position(|&k| k == i)
            .ok_or(SignError::NotInSubset)?;
        let eval_points: Vec<Scalar<E>> = subset.iter().map(|&k| eval_point(k)).collect();
        let w_i = vss::lagrange_coefficient(&eval_points, eval_point(i))
            .ok_or(SignError::DegenerateSubset)?
            * share.core.x.as_ref();

        let t = subset.len();
        Ok(Self {
            i,
            subset,
            pos,
            share,
            sid,
            rng,
            w_i,
            k_i: None,
            gamma_i: None,
            paillier_sk: None,
            decommit: None,
            big_gamma_i: None,
            peer_commitments: vec![None; t],
            peer_enc_k: vec![None; t],
            peer_big_gamma: vec![None; t],
            beta_gamma: vec![None; t],
            beta_w: vec![None; t],
            alpha_gamma: vec![None; t],
            alpha_w: vec![None; t],
            peer_delta: vec![None; t],
            _l: PhantomData,
        })
    }

    fn peer_paillier(&self, global: u16) -> PaillierPublicKey {
        PaillierPublicKey {
            n: self.share.parties[usize::from(global)].N.clone(),
        }
    }

    fn my_aux(&self) -> Aux {
        let mine = &self.share.parties[usize::from(self.i)];
        Aux {
            pedersen: PedersenParameters {
                n: mine.N.clone(),
                s: mine.s.clone(),
                t: mine.t.clone(),
            },
        }
    }

    fn peer_aux(&self, global: u16) -> Aux {
        let peer = &self.share.parties[usize::from(global)];
        Aux {
            pedersen: PedersenParameters {
                n: peer.N.clone(),
                s: peer.s.clone(),
                t: peer.t.clone(),
            },
        }
    }
}

impl<E, L, D, R> Protocol for Presign<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
{
    type Message = Msg<E, D>;
    type Output = Presignature<E>;
    type Error = SignError;

    fn round_count(&self) -> u16 {
        2
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let k_i = Scalar::<E>::random(&mut self.rng);
        let gamma_i = Scalar::<E>::random(&mut self.rng);
        let big_gamma_i = Point::<E>::generator() * gamma_i;

        let paillier_sk =
            PaillierPrivateKey::from_primes(self.share.p.clone(), self.share.q.clone()).map_err(|_| SignError::PaillierOp)?;
        let my_pk = paillier_sk.public_key();
        let k_bn = scalar_to_bignumber(&k_i);
        let (enc_k, rho) = my_pk.encrypt(&k_bn, &mut self.rng).map_err(|_| SignError::PaillierOp)?;

        let (commitment, decommit) = HashCommit::<D>::builder()
            .mix_bytes(&self.sid)
            .mix(self.i)
            .mix(big_gamma_i)
            .commit(&mut self.rng);

        let data = range_proof::Data {
            paillier_n: my_pk,
            ciphertext: enc_k.clone(),
        };
        let witness = range_proof::PrivateData {
            x: k_bn,
            rho,
        };
        let peers: Vec<u16> = self.subset.iter().copied().filter(|&j| j != self.i).collect();
        let mut range_proofs = Vec::with_capacity(peers.len());
        for j in peers {
            let aux = self.peer_aux(j);
            let proof = range_proof::prove::<L, D, _>(&self.sid, &data, &witness, &aux, &mut self.rng);
            range_proofs.push((j, proof));
        }

        self.k_i = Some(k_i);
        self.gamma_i = Some(gamma_i);
        self.big_gamma_i = Some(big_gamma_i);
        self.peer_big_gamma[self.pos] = Some(big_gamma_i);
        self.decommit = Some(decommit);
        self.paillier_sk = Some(paillier_sk);

        Ok(vec![OutMsg::broadcast(Msg::Round1(MsgRound1 {
            enc_k,
            commitment,
            range_proofs,
        }))])
    }

    fn handle_round(
        &mut self,
        round: u16,
        messages: Vec<(u16, Self::Message)>,
    ) -> Result<StepOutcome<Self::Message, Self::Output>, Self::Error> {
        match round {
            0 => {
                let my_aux = self.my_aux();
                for (j, msg) in messages {
                    let Msg::Round1(m) = msg else {
                        return Err(SignError::UnexpectedMessage);
                    };
                    let pos_j = self.pos_of(j)?;
                    let data = range_proof::Data {
                        paillier_n: self.peer_paillier(j),
                        ciphertext: m.enc_k.clone(),
                    };
                    let proof = m
                        .range_proofs
                        .iter()
                        .find(|(to, _)| *to == self.i)
                        .map(|(_, p)| p)
                        .ok_or(SignError::MissingRangeProof { sender: j })?;
                    range_proof::verify::<L, D>(&self.sid, &data, &my_aux, proof)
                        .map_err(|_| SignError::InvalidRangeProof { sender: j })?;

                    self.peer_enc_k[pos_j] = Some(m.enc_k);
                    self.peer_commitments[pos_j] = Some(m.commitment);
                }

                let mut mta_responses = Vec::with_capacity(self.subset.len() - 1);
                let gamma_i = self.gamma_i.expect("set in start");
                let w_i = self.w_i;
                for pos_j in 0..self.subset.len() {
                    if pos_j == self.pos {
                        continue;
                    }
                    let j = self.subset[pos_j];
                    let their_pk = self.peer_paillier(j);
                    let their_enc_k = self.peer_enc_k[pos_j].clone().ok_or(SignError::MissingMessage { sender: j })?;

                    let (gamma_resp, beta_gamma) = mta_respond(&their_enc_k, &their_pk, &scalar_to_bignumber(&gamma_i), &mut self.rng)
                        .map_err(|_| SignError::PaillierOp)?;
                    let (w_resp, beta_w) = mta_respond(&their_enc_k, &their_pk, &scalar_to_bignumber(&w_i), &mut self.rng)
                        .map_err(|_| SignError::PaillierOp)?;

                    self.beta_gamma[pos_j] = Some(beta_gamma);
                    self.beta_w[pos_j] = Some(beta_w);
                    mta_responses.push((j, gamma_resp, w_resp));
                }

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round2(
                    MsgRound2 {
                        big_gamma: self.big_gamma_i.expect("set in start"),
                        decommit: self.decommit.clone().expect("set in start"),
                        mta_responses,
                    },
                ))]))
            }
            1 => {
                for (j, msg) in messages {
                    let Msg::Round2(m) = msg else {
                        return Err(SignError::UnexpectedMessage);
                    };
                    let pos_j = self.pos_of(j)?;
                    let commitment = self.peer_commitments[pos_j].clone().ok_or(SignError::MissingMessage { sender: j })?;
                    HashCommit::<D>::builder()
                        .mix_bytes(&self.sid)
                        .mix(j)
                        .mix(m.big_gamma)
                        .verify(&commitment, &m.decommit)
                        .map_err(|_| SignError::InvalidDecommitment { sender: j })?;
                    self.peer_big_gamma[pos_j] = Some(m.big_gamma);

                    let (_, gamma_resp, w_resp) = m
                        .mta_responses
                        .iter()
                        .find(|(to, _, _)| *to == self.i)
                        .cloned()
                        .ok_or(SignError::MissingMessage { sender: j })?;
                    let sk = self.paillier_sk.as_ref().expect("set in start");
                    let gamma_plain = sk.decrypt(&gamma_resp).map_err(|_| SignError::PaillierOp)?;
                    let w_plain = sk.decrypt(&w_resp).map_err(|_| SignError::PaillierOp)?;
                    self.alpha_gamma[pos_j] = Some(bignumber_to_scalar::<E>(&gamma_plain));
                    self.alpha_w[pos_j] = Some(bignumber_to_scalar::<E>(&w_plain));
                }

                let mut delta = self.k_i.expect("set in start") * self.gamma_i.expect("set in start");
                let mut chi = self.k_i.expect("set in start") * self.w_i;
                for pos_j in 0..self.subset.len() {
                    if pos_j == self.pos {
                        continue;
                    }
                    delta = delta + self.alpha_gamma[pos_j].expect("decrypted above")
                        - bignumber_to_scalar::<E>(self.beta_gamma[pos_j].as_ref().expect("set in round 0"));
                    chi = chi + self.alpha_w[pos_j].expect("decrypted above")
                        - bignumber_to_scalar::<E>(self.beta_w[pos_j].as_ref().expect("set in round 0"));
                }
                self.peer_delta[self.pos] = Some(delta);
                self.w_i = chi; // repurpose storage: chi_i replaces w_i, no longer needed past this point.

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round3(
                    MsgRound3 { delta },
                ))]))
            }
            2 => {
                for (j, msg) in messages {
                    let Msg::Round3(m) = msg else {
                        return Err(SignError::UnexpectedMessage);
                    };
                    let pos_j = self.pos_of(j)?;
                    self.peer_delta[pos_j] = Some(m.delta);
                }

                let delta: Scalar<E> = self.peer_delta.iter().map(|d| d.expect("collected above")).sum();
                let delta_inv = delta.invert().ok_or(SignError::ZeroNonce)?;
                let big_gamma: Point<E> = self.peer_big_gamma.iter().map(|g| g.expect("collected above")).sum();
                let big_r = big_gamma * delta_inv;
                let r = x_coordinate(&big_r);

                Ok(StepOutcome::Done(Presignature {
                    r,
                    big_r,
                    k_i: self.k_i.expect("set in start"),
                    chi_i: self.w_i,
                }))
            }
            _ => Err(SignError::UnexpectedMessage),
        }
    }
}

impl<E, L, D, R> Presign<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest,
{
    fn pos_of(&self, global: u16) -> Result<usize, SignError> {
        self.subset
            .iter()
            .position(|&k| k == global)
            .ok_or(SignError::MissingMessage { sender: global })
    }
}

fn eval_point<E: Curve>(k: u16) -> Scalar<E> {
    Scalar::<E>::from(u64::from(k) + 1)
}

/// Runs one side of a Paillier-based multiplicative-to-additive share
/// conversion: given the peer's ciphertext `Enc_peer(a)` and my own value
/// `b`, returns `Enc_peer(a*b + beta)` to send back, and `beta` (this
/// party's additive share is `-beta mod q`; the peer's is whatever it
/// decrypts, reduced mod q). `beta` is sampled far larger than `q^2` so the
/// peer's decrypted value statistically hides `a*b`, while staying well
/// under `N` so the Paillier plaintext never wraps.
fn mta_respond<R: RngCore + CryptoRng>(
    their_ciphertext: &BigNumber,
    their_pk: &PaillierPublicKey,
    my_value: &BigNumber,
    rng: &mut R,
) -> Result<(BigNumber, BigNumber), crate::paillier::PaillierError> {
    let term = their_pk.scalar_mul(their_ciphertext, my_value);
    let beta = BigNumber::from_rng(&(their_pk.n.clone() >> 1), rng);
    let (enc_beta, _) = their_pk.encrypt(&beta, rng)?;
    let response = their_pk.add(&term, &enc_beta);
    Ok((response, beta))
}

/// This party's contribution to the final signature, computed once the
/// message is known. Message-dependent, so deliberately not part of the
/// [`Presign`] state machine: broadcasting and summing these is cheap
/// enough to not need its own session.
pub fn sigma_contribution<E: Curve>(presig: &Presignature<E>, message: Scalar<E>) -> Scalar<E> {
    message * presig.k_i + presig.r * presig.chi_i
}

/// Combines every party's `sigma_i` into the final, low-s-normalized
/// signature, and verifies it against the shared public key before
/// returning it.
pub fn combine_signature<E: Curve>(
    message: Scalar<E>,
    y: Point<E>,
    r: Scalar<E>,
    sigmas: &[Scalar<E>],
) -> Result<Signature<E>, SignError> {
    let mut s: Scalar<E> = sigmas.iter().copied().sum();
    if is_high_s::<E>(&s) {
        s = -s;
    }
    verify_ecdsa::<E>(message, r, s, y).map_err(|_| SignError::SignatureInvalid)?;
    Ok(Signature { r, s })
}

#[derive(Debug, Error)]
pub enum SignError {
    #[error("local party is not a member of the declared signing subset")]
    NotInSubset,
    #[error("signing subset is degenerate (duplicate evaluation points)")]
    DegenerateSubset,
    #[error("a nonce or accumulated delta reduced to zero; retry with fresh randomness")]
    ZeroNonce,
    #[error("paillier operation failed")]
    PaillierOp,
    #[error("missing message from party {sender}")]
    MissingMessage { sender: u16 },
    #[error("missing range proof addressed to us from party {sender}")]
    MissingRangeProof { sender: u16 },
    #[error("peer {sender}'s range proof on its nonce ciphertext is invalid")]
    InvalidRangeProof { sender: u16 },
    #[error("peer {sender}'s decommitment doesn't match the earlier commitment")]
    InvalidDecommitment { sender: u16 },
    #[error("assembled signature failed to verify against the shared public key")]
    SignatureInvalid,
    #[error("unexpected message variant for this round")]
    UnexpectedMessage,
}
