//! UC-secure Feldman-VSS based distributed key generation, shared by
//! threshold ECDSA (`tss_core::threshold_ecdsa::keygen`) and threshold
//! EdDSA (`tss_core::eddsa::keygen`) keygen.
//!
//! This crate only produces a [`key_share::IncompleteKeyShare`]: the
//! ECDSA-specific auxiliary round (Paillier/Ring-Pedersen, aka "key
//! refresh") that turns it into a signing-capable `KeyShare` lives in
//! `tss_core::threshold_ecdsa::keygen`, since EdDSA doesn't need it at all.
//!
//! Round shape, mirroring §4.5 of the distilled spec:
//! 1. Sample a degree-`t-1` polynomial; broadcast a hash commitment to its
//!    Feldman commitments and to a Schnorr ephemeral commitment.
//! 2. Open the commitment (broadcast the Feldman commitments themselves).
//! 3. Send every peer its private Shamir share (p2p).
//! 4. Broadcast a Schnorr proof of knowledge of the resulting share,
//!    against the publicly-derivable verification point.

use std::marker::PhantomData;

use digest::Digest;
use generic_ec::{hash_to_curve::FromHash, Curve, Point, Scalar, SecretScalar};
use generic_ec_zkp::{
    hash_commitment::{self, HashCommit},
    schnorr_pok,
};
use key_share::{
    security_level::SecurityLevel,
    session::{OutMsg, Protocol, StepOutcome},
    vss::Polynomial,
    IncompleteKeyShare,
};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

/// Messages exchanged by the DKG, one variant per round.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub enum Msg<E: Curve, D: Digest> {
    Round1(MsgRound1<D>),
    Round2(MsgRound2<E, D>),
    Round3(MsgRound3<E>),
    Round4(MsgRound4<E>),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound1<D: Digest> {
    commitment: HashCommit<D>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound2<E: Curve, D: Digest> {
    /// Feldman commitments to this party's polynomial coefficients,
    /// `{A_k = a_k * G}`, constant term first.
    feldman_commitments: Vec<Point<E>>,
    sch_commit: schnorr_pok::Commit<E>,
    decommit: hash_commitment::DecommitNonce<D>,
}

/// Unicast: this party's Shamir share of the recipient, `f_i(recipient)`.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound3<E: Curve> {
    share: Scalar<E>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound4<E: Curve> {
    schnorr_proof: schnorr_pok::Proof<E>,
}

struct Opening<E: Curve> {
    feldman_commitments: Vec<Point<E>>,
    sch_commit: schnorr_pok::Commit<E>,
}

/// Evaluates a Feldman-committed polynomial at `x`, in the exponent:
/// `sum_k commitments[k] * x^k`, via Horner's method.
fn evaluate_in_exponent<E: Curve>(commitments: &[Point<E>], x: Scalar<E>) -> Point<E> {
    let mut acc = Point::<E>::zero();
    for c in commitments.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

/// Party index `k` (0-based) is evaluated at scalar point `k + 1`, so that
/// no party's share ever equals the polynomial's constant term (reserved
/// for the secret itself).
fn eval_point<E: Curve>(k: u16) -> Scalar<E> {
    Scalar::<E>::from(u64::from(k) + 1)
}

/// Driving state of the DKG for one local party.
pub struct Dkg<E: Curve, L: SecurityLevel, D: Digest, R> {
    i: u16,
    n: u16,
    t: u16,
    rng: R,
    sid: Vec<u8>,
    fixed_constant_term: Option<Scalar<E>>,

    polynomial: Option<Polynomial<Scalar<E>>>,
    sch_secret: Option<schnorr_pok::Secret<E>>,
    sch_commit: Option<schnorr_pok::Commit<E>>,
    decommit: Option<hash_commitment::DecommitNonce<D>>,

    peer_commitments: Vec<Option<HashCommit<D>>>,
    openings: Vec<Option<Opening<E>>>,
    shares: Vec<Option<Scalar<E>>>,
    x_i: Option<Scalar<E>>,

    _l: PhantomData<L>,
}

impl<E, L, D, R> Dkg<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
{
    /// `i`: this party's 0-based index. `n`: total shareholders. `t`:
    /// threshold (any `t` of `n` can reconstruct). `sid`: session/execution
    /// id, mixed into every commitment and challenge so transcripts from
    /// distinct sessions never collide.
    pub fn new(i: u16, n: u16, t: u16, sid: Vec<u8>, rng: R) -> Self {
        Self {
            i,
            n,
            t,
            rng,
            sid,
            fixed_constant_term: None,
            polynomial: None,
            sch_secret: None,
            sch_commit: None,
            decommit: None,
            peer_commitments: vec![None; usize::from(n)],
            openings: (0..n).map(|_| None).collect(),
            shares: vec![None; usize::from(n)],
            x_i: None,
            _l: PhantomData,
        }
    }

    /// Same as [`Self::new`], but the polynomial's constant term is fixed
    /// to `existing_secret` instead of sampled fresh. Used by reshare: the
    /// reconstructed secret after the run is guaranteed unchanged because
    /// every shareholder re-shares its *current* share rather than a new
    /// random value (a party absent from the old set passes `Scalar::zero()`
    /// here, so the sum of constant terms the new set contributes is
    /// unaffected).
    pub fn new_with_constant_term(
        i: u16,
        n: u16,
        t: u16,
        sid: Vec<u8>,
        constant_term: Scalar<E>,
        rng: R,
    ) -> Self {
        let mut this = Self::new(i, n, t, sid, rng);
        this.fixed_constant_term = Some(constant_term);
        this
    }
}

impl<E, L, D, R> Protocol for Dkg<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    type Message = Msg<E, D>;
    type Output = IncompleteKeyShare<E, L>;
    type Error = DkgError;

    fn round_count(&self) -> u16 {
        3
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let constant_term = self
            .fixed_constant_term
            .unwrap_or_else(|| Scalar::<E>::random(&mut self.rng));
        let poly = Polynomial::sample(
            usize::from(self.t) - 1,
            constant_term,
            |rng| Scalar::<E>::random(rng),
            &mut self.rng,
        );
        let feldman_commitments: Vec<Point<E>> =
            poly.coeffs.iter().map(|a| Point::generator() * a).collect();

        let (sch_secret, sch_commit) =
            schnorr_pok::prover_commits_ephemeral_secret::<E, _>(&mut self.rng);

        let (commitment, decommit) = HashCommit::<D>::builder()
            .mix_bytes(&self.sid)
            .mix(self.n)
            .mix(self.i)
            .mix_many(&feldman_commitments)
            .mix(sch_commit.0)
            .commit(&mut self.rng);

        // Own opening is known locally; never travels over the network.
        self.openings[usize::from(self.i)] = Some(Opening {
            feldman_commitments: feldman_commitments.clone(),
            sch_commit: sch_commit.clone(),
        });

        self.polynomial = Some(poly);
        self.sch_secret = Some(sch_secret);
        self.sch_commit = Some(sch_commit);
        self.decommit = Some(decommit);

        Ok(vec![OutMsg::broadcast(Msg::Round1(MsgRound1 {
            commitment,
        }))])
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
                let sch_commit = self.sch_commit.clone().expect("set in start");
                let decommit = self.decommit.clone().expect("set in start");

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round2(
                    MsgRound2 {
                        feldman_commitments,
                        sch_commit,
                        decommit,
                    },
                ))]))
            }
            1 => {
                for (j, msg) in messages {
                    let Msg::Round2(m) = msg else {
                        return Err(DkgError::UnexpectedMessage { round, sender: j });
                    };
                    let commitment = self.peer_commitments[usize::from(j)]
                        .clone()
                        .ok_or(DkgError::MissingCommitment { sender: j })?;
                    HashCommit::<D>::builder()
                        .mix_bytes(&self.sid)
                        .mix(self.n)
                        .mix(j)
                        .mix_many(&m.feldman_commitments)
                        .mix(m.sch_commit.0)
                        .verify(&commitment, &m.decommit)
                        .map_err(|_| DkgError::InvalidDecommitment { sender: j })?;
                    if m.feldman_commitments.len() != usize::from(self.t) {
                        return Err(DkgError::WrongDegree { sender: j });
                    }
                    self.openings[usize::from(j)] = Some(Opening {
                        feldman_commitments: m.feldman_commitments,
                        sch_commit: m.sch_commit,
                    });
                }

                let poly = self.polynomial.as_ref().expect("set in start");
                let mut out = Vec::with_capacity(usize::from(self.n) - 1);
                for j in 0..self.n {
                    if j == self.i {
                        continue;
                    }
                    let share = poly.evaluate(eval_point::<E>(j));
                    out.push(OutMsg::p2p(j, Msg::Round3(MsgRound3 { share })));
                }
                // Our own share never travels over the network.
                self.shares[usize::from(self.i)] = Some(poly.evaluate(eval_point::<E>(self.i)));

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
                    let expected =
                        evaluate_in_exponent(&opening.feldman_commitments, eval_point::<E>(self.i));
                    if Point::generator() * &m.share != expected {
                        return Err(DkgError::InvalidShare { sender: j });
                    }
                    self.shares[usize::from(j)] = Some(m.share);
                }

                let x_i: Scalar<E> = self
                    .shares
                    .iter()
                    .map(|s| s.expect("all shares received by now"))
                    .sum();
                self.x_i = Some(x_i);

                let challenge = self.schnorr_challenge(self.i, Point::generator() * &x_i)?;
                let sch_secret = self.sch_secret.as_ref().expect("set in start");
                let mut x_i_mut = x_i;
                let proof = schnorr_pok::prove(sch_secret, &challenge, &SecretScalar::new(&mut x_i_mut));

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round4(
                    MsgRound4 {
                        schnorr_proof: proof,
                    },
                ))]))
            }
            3 => {
                for (j, msg) in messages {
                    let Msg::Round4(m) = msg else {
                        return Err(DkgError::UnexpectedMessage { round, sender: j });
                    };
                    let x_j_public = self.public_share_of(j)?;
                    let opening = self.openings[usize::from(j)]
                        .as_ref()
                        .ok_or(DkgError::MissingCommitment { sender: j })?;
                    let challenge = self.schnorr_challenge(j, x_j_public)?;
                    if m.schnorr_proof
                        .verify(&opening.sch_commit, &challenge, &x_j_public)
                        .is_err()
                    {
                        return Err(DkgError::InvalidSchnorrProof { sender: j });
                    }
                }

                let public_shares: Vec<Point<E>> = (0..self.n)
                    .map(|k| self.public_share_of(k))
                    .collect::<Result<_, _>>()?;
                let shared_public_key = public_shares.iter().copied().sum();
                let mut x_i = self.x_i.expect("computed in round 2");

                Ok(StepOutcome::Done(IncompleteKeyShare {
                    i: self.i,
                    shared_public_key,
                    rid: Default::default(),
                    public_shares,
                    x: SecretScalar::new(&mut x_i),
                }))
            }
            _ => Err(DkgError::UnexpectedMessage {
                round,
                sender: u16::MAX,
            }),
        }
    }
}

impl<E, L, D, R> Dkg<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest,
    Scalar<E>: FromHash,
{
    /// Public verification point of party `k`'s final share,
    /// `X_k = sum_j f_j(k+1) * G`, derivable by anyone from the Feldman
    /// commitments collected in round 2.
    fn public_share_of(&self, k: u16) -> Result<Point<E>, DkgError> {
        let x = eval_point::<E>(k);
        let mut acc = Point::<E>::zero();
        for j in 0..self.n {
            let opening = self.openings[usize::from(j)]
                .as_ref()
                .ok_or(DkgError::MissingCommitment { sender: j })?;
            acc = acc + evaluate_in_exponent(&opening.feldman_commitments, x);
        }
        Ok(acc)
    }

    fn schnorr_challenge(&self, party: u16, public_point: Point<E>) -> Result<schnorr_pok::Challenge<E>, DkgError> {
        let tag = generic_ec::hash_to_curve::Tag::new(&self.sid).ok_or(DkgError::InvalidTag)?;
        let nonce = Scalar::<E>::hash_concat(
            tag,
            &[&party.to_be_bytes(), public_point.to_bytes(true).as_ref()],
        )
        .map_err(|_| DkgError::HashToScalar)?;
        Ok(schnorr_pok::Challenge { nonce })
    }
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
    #[error("share from party {sender} doesn't match their Feldman commitments")]
    InvalidShare { sender: u16 },
    #[error("schnorr proof of knowledge from party {sender} is invalid")]
    InvalidSchnorrProof { sender: u16 },
    #[error("hash-to-curve tag could not be built from session id")]
    InvalidTag,
    #[error("hash-to-scalar failed")]
    HashToScalar,
}
