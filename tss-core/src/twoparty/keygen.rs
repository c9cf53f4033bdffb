//! Two-party ECDSA keygen (spec §4.4, step 1-3): P1 generates a Paillier
//! keypair and Ring-Pedersen parameters up front; both parties run a
//! commit-reveal joint Schnorr-style generation of additive shares `x1,
//! x2` with `Y = (x1 + x2) * G`; P1 then Paillier-encrypts `x1` and proves
//! the ciphertext is well-formed and consistent with its public share, so
//! P2 can use `E(x1)` during signing without ever seeing `x1`.

use digest::Digest;
use generic_ec::{hash_to_curve::FromHash, Curve, Point, Scalar, SecretScalar};
use generic_ec_zkp::hash_commitment::{self, HashCommit};
use key_share::{
    security_level::SecurityLevel,
    session::{OutMsg, Protocol, StepOutcome},
    twoparty::{KeyShareP1, KeyShareP2},
};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::paillier::{PaillierPrivateKey, PreParams};
use crate::pedersen::PedersenTrapdoor;
use crate::utils::scalar_to_bignumber;
use crate::zk::{dln_proof, group_vs_paillier, Aux};

use super::Role;

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub enum Msg<E: Curve, D: Digest> {
    Round1(MsgRound1<E, D>),
    Round2(MsgRound2<E, D>),
    Round3(MsgRound3<E>),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound1<E: Curve, D: Digest> {
    commitment: HashCommit<D>,
    /// Present only on the message P1 sends.
    p1_material: Option<P1Material>,
    #[serde(skip)]
    _e: std::marker::PhantomData<E>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct P1Material {
    paillier_n: libpaillier::unknown_order::BigNumber,
    pedersen: crate::pedersen::PedersenParameters,
    dln_proof: dln_proof::Proof,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct MsgRound2<E: Curve, D: Digest> {
    point: Point<E>,
    decommit: hash_commitment::DecommitNonce<D>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub enum MsgRound3<E: Curve> {
    P1Contribution {
        enc_x1: libpaillier::unknown_order::BigNumber,
        proof: group_vs_paillier::Proof<E>,
    },
    Ack,
}

pub enum Output<E: Curve> {
    P1(KeyShareP1<E>),
    P2(KeyShareP2<E>),
}

pub struct Keygen<E: Curve, L: SecurityLevel, D: Digest, R> {
    role: Role,
    rng: R,
    sid: Vec<u8>,

    x: Option<SecretScalar<E>>,
    big_x: Option<Point<E>>,
    decommit: Option<hash_commitment::DecommitNonce<D>>,
    peer_commitment: Option<HashCommit<D>>,
    peer_point: Option<Point<E>>,

    // P1-only state.
    paillier_sk: Option<PaillierPrivateKey>,
    pedersen_trapdoor: Option<PedersenTrapdoor>,

    // P2-only state.
    peer_paillier_n: Option<libpaillier::unknown_order::BigNumber>,
    peer_pedersen: Option<crate::pedersen::PedersenParameters>,

    _l: std::marker::PhantomData<L>,
}

impl<E, L, D, R> Keygen<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
{
    pub fn new(role: Role, sid: Vec<u8>, rng: R) -> Self {
        Self {
            role,
            rng,
            sid,
            x: None,
            big_x: None,
            decommit: None,
            peer_commitment: None,
            peer_point: None,
            paillier_sk: None,
            pedersen_trapdoor: None,
            peer_paillier_n: None,
            peer_pedersen: None,
            _l: std::marker::PhantomData,
        }
    }
}

impl<E, L, D, R> Protocol for Keygen<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    type Message = Msg<E, D>;
    type Output = Output<E>;
    type Error = KeygenError;

    fn round_count(&self) -> u16 {
        3
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let mut x = Scalar::<E>::random(&mut self.rng);
        let big_x = Point::<E>::generator() * x;

        let p1_material = if self.role == Role::P1 {
            let prep = PreParams::<L>::generate(&mut self.rng);
            let (p, q) = prep.split();
            let sk = PaillierPrivateKey::from_primes(p.clone(), q.clone())
                .map_err(|_| KeygenError::PaillierKeygen)?;
            let trapdoor = PedersenTrapdoor::generate(&p, &q, &mut self.rng)
                .map_err(|_| KeygenError::PedersenKeygen)?;
            let proof = dln_proof::prove::<L, D, _>(&self.sid, &trapdoor, &mut self.rng);
            let material = P1Material {
                paillier_n: sk.public_key().n,
                pedersen: trapdoor.params.clone(),
                dln_proof: proof,
            };
            self.paillier_sk = Some(sk);
            self.pedersen_trapdoor = Some(trapdoor);
            Some(material)
        } else {
            None
        };

        let (commitment, decommit) = HashCommit::<D>::builder()
            .mix_bytes(&self.sid)
            .mix(self.role.index())
            .mix(big_x)
            .commit(&mut self.rng);

        self.x = Some(SecretScalar::new(&mut x));
        self.big_x = Some(big_x);
        self.decommit = Some(decommit);

        Ok(vec![OutMsg::broadcast(Msg::Round1(MsgRound1 {
            commitment,
            p1_material,
            _e: std::marker::PhantomData,
        }))])
    }

    fn handle_round(
        &mut self,
        round: u16,
        messages: Vec<(u16, Self::Message)>,
    ) -> Result<StepOutcome<Self::Message, Self::Output>, Self::Error> {
        match round {
            0 => {
                let (_, msg) = messages.into_iter().next().ok_or(KeygenError::MissingPeerMessage)?;
                let Msg::Round1(m) = msg else {
                    return Err(KeygenError::UnexpectedMessage);
                };
                self.peer_commitment = Some(m.commitment);
                if self.role == Role::P2 {
                    let material = m.p1_material.ok_or(KeygenError::MissingP1Material)?;
                    dln_proof::verify::<L, D>(&self.sid, &material.pedersen, &material.dln_proof)
                        .map_err(|_| KeygenError::InvalidDlnProof)?;
                    self.peer_paillier_n = Some(material.paillier_n);
                    self.peer_pedersen = Some(material.pedersen);
                }

                let point = self.big_x.expect("set in start");
                let decommit = self.decommit.clone().expect("set in start");
                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(Msg::Round2(
                    MsgRound2 { point, decommit },
                ))]))
            }
            1 => {
                let (_, msg) = messages.into_iter().next().ok_or(KeygenError::MissingPeerMessage)?;
                let Msg::Round2(m) = msg else {
                    return Err(KeygenError::UnexpectedMessage);
                };
                let peer_role_index = if self.role == Role::P1 { 1u16 } else { 0u16 };
                let commitment = self.peer_commitment.clone().expect("set in round 0");
                HashCommit::<D>::builder()
                    .mix_bytes(&self.sid)
                    .mix(peer_role_index)
                    .mix(m.point)
                    .verify(&commitment, &m.decommit)
                    .map_err(|_| KeygenError::InvalidDecommitment)?;
                self.peer_point = Some(m.point);

                let out = if self.role == Role::P1 {
                    let sk = self.paillier_sk.as_ref().expect("set in start");
                    let pk = sk.public_key();
                    let x1 = self.x.as_ref().expect("set in start");
                    let x1_big = scalar_to_bignumber(x1.as_ref());
                    let (enc_x1, rho) = pk.encrypt(&x1_big, &mut self.rng).map_err(|_| KeygenError::PaillierEncrypt)?;
                    let trapdoor = self.pedersen_trapdoor.as_ref().expect("set in start");
                    let aux = Aux {
                        pedersen: trapdoor.params.clone(),
                    };
                    let data = group_vs_paillier::Data {
                        paillier_n: pk,
                        ciphertext: enc_x1.clone(),
                        x_public: self.big_x.expect("set in start"),
                    };
                    let witness = group_vs_paillier::PrivateData { x: x1_big, rho };
                    let proof = group_vs_paillier::prove::<E, L, D, _>(&self.sid, &data, &witness, &aux, &mut self.rng);
                    Msg::Round3(MsgRound3::P1Contribution { enc_x1, proof })
                } else {
                    Msg::Round3(MsgRound3::Ack)
                };

                Ok(StepOutcome::Continue(vec![OutMsg::broadcast(out)]))
            }
            2 => {
                let (_, msg) = messages.into_iter().next().ok_or(KeygenError::MissingPeerMessage)?;
                let Msg::Round3(m) = msg else {
                    return Err(KeygenError::UnexpectedMessage);
                };

                let shared_public_key = self.big_x.expect("set in start") + self.peer_point.expect("set in round 1");

                let output = match (self.role, m) {
                    (Role::P1, MsgRound3::Ack) => {
                        let sk = self.paillier_sk.take().expect("set in start");
                        let share = KeyShareP1 {
                            x1: self.x.take().expect("set in start"),
                            paillier_p: sk.p().clone(),
                            paillier_q: sk.q().clone(),
                            shared_public_key,
                        };
                        share.validate::<L>().map_err(KeygenError::InvalidOutput)?;
                        Output::P1(share)
                    }
                    (Role::P2, MsgRound3::P1Contribution { enc_x1, proof }) => {
                        let paillier_n = self.peer_paillier_n.clone().expect("set in round 0");
                        let pedersen = self.peer_pedersen.clone().expect("set in round 0");
                        let pk = crate::paillier::PaillierPublicKey { n: paillier_n.clone() };
                        let aux = Aux { pedersen };
                        let data = group_vs_paillier::Data {
                            paillier_n: pk,
                            ciphertext: enc_x1.clone(),
                            x_public: self.peer_point.expect("set in round 1"),
                        };
                        group_vs_paillier::verify::<E, L, D>(&self.sid, &data, &aux, &proof)
                            .map_err(|_| KeygenError::InvalidKeygenProof)?;
                        let share = KeyShareP2 {
                            x2: self.x.take().expect("set in start"),
                            paillier_n,
                            enc_x1,
                            shared_public_key,
                        };
                        share.validate::<L>().map_err(KeygenError::InvalidOutput)?;
                        Output::P2(share)
                    }
                    _ => return Err(KeygenError::UnexpectedMessage),
                };

                Ok(StepOutcome::Done(output))
            }
            _ => Err(KeygenError::UnexpectedMessage),
        }
    }
}

#[derive(Debug, Error)]
pub enum KeygenError {
    #[error("paillier key generation failed")]
    PaillierKeygen,
    #[error("pedersen parameter generation failed")]
    PedersenKeygen,
    #[error("paillier encryption failed")]
    PaillierEncrypt,
    #[error("peer's dln proof is invalid")]
    InvalidDlnProof,
    #[error("peer's decommitment doesn't match the earlier commitment")]
    InvalidDecommitment,
    #[error("peer's keygen proof is invalid")]
    InvalidKeygenProof,
    #[error("expected p1's paillier/pedersen material but it was absent")]
    MissingP1Material,
    #[error("expected exactly one peer message this round")]
    MissingPeerMessage,
    #[error("unexpected message variant for this round/role")]
    UnexpectedMessage,
    #[error(transparent)]
    InvalidOutput(key_share::twoparty::InvalidTwoPartyShare),
}
