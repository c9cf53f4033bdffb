//! Threshold ECDSA keygen: `threshold-keygen`'s Feldman DKG (rounds 0-3)
//! followed by the aux-info round (rounds 4-7) that attaches the Paillier
//! keypair, Ring-Pedersen parameters, and El-Gamal key every signing round
//! needs, turning the DKG's bare [`IncompleteKeyShare`] into a
//! signing-capable [`KeyShare`].
//!
//! Grounded on the teacher's `cggmp21::key_refresh` round (same aux
//! material, same proof set: DLN at publish time, a Paillier-Blum modulus
//! proof and a no-small-factor proof once moduli are known, plus a Schnorr
//! proof of the El-Gamal key), adapted from its async `round_based`/`Mpc`
//! shape to this workspace's [`Protocol`] state machine, and composed with
//! the DKG into a single operation (an aux-info round with no key share to
//! attach to is never useful on its own, unlike the teacher's standalone
//! key-refresh operation).

use digest::Digest;
use generic_ec::{
    hash_to_curve::{FromHash, Tag},
    Curve, Point, Scalar, SecretScalar,
};
use generic_ec_zkp::{
    hash_commitment::{self, HashCommit},
    schnorr_pok,
};
use key_share::{
    security_level::SecurityLevel,
    session::{OutMsg, Protocol, StepOutcome},
    IncompleteKeyShare, KeyShare, PartyAux, Valid,
};
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::paillier::{PaillierPrivateKey, PreParams};
use crate::pedersen::{PedersenParameters, PedersenTrapdoor};
use crate::utils::xor_bytes;
use crate::zk::{dln_proof, no_small_factor, paillier_blum_modulus, Aux};

use threshold_keygen::{Dkg, DkgError};

/// Combined DKG + aux-info message, one variant per round.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub enum Msg<E: Curve, D: Digest> {
    Dkg(threshold_keygen::Msg<E, D>),
    AuxRound1(AuxMsgRound1<D>),
    AuxRound2(AuxMsgRound2<E, D>),
    AuxRound3(AuxMsgRound3),
    AuxRound4(AuxMsgRound4<E>),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct AuxMsgRound1<D: Digest> {
    commitment: HashCommit<D>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct AuxMsgRound2<E: Curve, D: Digest> {
    n: BigNumber,
    s: BigNumber,
    t: BigNumber,
    big_y: Point<E>,
    rid: Vec<u8>,
    dln_proof: dln_proof::Proof,
    sch_commit: schnorr_pok::Commit<E>,
    decommit: hash_commitment::DecommitNonce<D>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct AuxMsgRound3 {
    mod_proof: paillier_blum_modulus::Proof,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct AuxMsgRound4<E: Curve> {
    fac_proof: no_small_factor::Proof,
    sch_proof: schnorr_pok::Proof<E>,
}

/// What every peer (including ourselves) opened in aux round 2: the public
/// half of its Paillier/Pedersen/El-Gamal contribution.
#[derive(Clone)]
struct PeerAux<E: Curve> {
    n: BigNumber,
    s: BigNumber,
    t: BigNumber,
    big_y: Point<E>,
    rid: Vec<u8>,
    sch_commit: schnorr_pok::Commit<E>,
}

/// Driving state of the combined DKG + aux-info keygen for one local party.
pub struct Keygen<E: Curve, L: SecurityLevel, D: Digest, R> {
    dkg: Dkg<E, L, D, R>,
    sid: Vec<u8>,
    pregenerated: Option<PreParams<L>>,
    rng: R,

    // Populated once the DKG phase (rounds 0-3) completes.
    core: Option<IncompleteKeyShare<E, L>>,
    paillier_sk: Option<PaillierPrivateKey>,
    pedersen_trapdoor: Option<PedersenTrapdoor>,
    y: Option<SecretScalar<E>>,
    big_y: Option<Point<E>>,
    rid: Option<Vec<u8>>,
    sch_secret: Option<schnorr_pok::Secret<E>>,
    sch_commit: Option<schnorr_pok::Commit<E>>,
    decommit: Option<hash_commitment::DecommitNonce<D>>,
    combined_sid: Option<Vec<u8>>,

    peer_commitments: Vec<Option<HashCommit<D>>>,
    peer_aux: Vec<Option<PeerAux<E>>>,
}

impl<E, L, D, R> Keygen<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
{
    /// `rng_dkg` drives the Feldman DKG phase, `rng_aux` the aux-info
    /// phase; kept separate so the two phases never draw from the same
    /// randomness stream.
    pub fn new(i: u16, n: u16, t: u16, sid: Vec<u8>, rng_dkg: R, rng_aux: R) -> Self {
        Self::from_dkg(Dkg::new(i, n, t, sid.clone(), rng_dkg), sid, rng_aux)
    }

    /// Reshare variant: `existing_secret` replaces the freshly sampled
    /// polynomial constant term, so the run is guaranteed to reconstruct
    /// the same secret it started with.
    pub fn new_reshare(
        i: u16,
        n: u16,
        t: u16,
        sid: Vec<u8>,
        existing_secret: Scalar<E>,
        rng_dkg: R,
        rng_aux: R,
    ) -> Self {
        Self::from_dkg(
            Dkg::new_with_constant_term(i, n, t, sid.clone(), existing_secret, rng_dkg),
            sid,
            rng_aux,
        )
    }

    fn from_dkg(dkg: Dkg<E, L, D, R>, sid: Vec<u8>, rng_aux: R) -> Self {
        Self {
            dkg,
            sid,
            pregenerated: None,
            rng: rng_aux,
            core: None,
            paillier_sk: None,
            pedersen_trapdoor: None,
            y: None,
            big_y: None,
            rid: None,
            sch_secret: None,
            sch_commit: None,
            decommit: None,
            combined_sid: None,
            peer_commitments: Vec::new(),
            peer_aux: Vec::new(),
        }
    }

    /// Supplies a pre-generated Paillier key pair, skipping the safe-prime
    /// search (the dominant cost of this protocol) at run time. See
    /// [`PreParams::generate`].
    pub fn set_pregenerated(mut self, pregenerated: PreParams<L>) -> Self {
        self.pregenerated = Some(pregenerated);
        self
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
    type Output = Valid<KeyShare<E, L>>;
    type Error = KeygenError;

    fn round_count(&self) -> u16 {
        // 4 DKG rounds (0-3) followed by 4 aux-info rounds (4-7).
        7
    }

    fn start(&mut self) -> Result<Vec<OutMsg<Self::Message>>, Self::Error> {
        let out = self.dkg.start()?;
        Ok(out.into_iter().map(|m| m.map_payload(Msg::Dkg)).collect())
    }

    fn handle_round(
        &mut self,
        round: u16,
        messages: Vec<(u16, Self::Message)>,
    ) -> Result<StepOutcome<Self::Message, Self::Output>, Self::Error> {
        if round <= 3 {
            let unwrapped = unwrap_all(round, messages, |m| match m {
                Msg::Dkg(inner) => Some(inner),
                _ => None,
            })?;
            return match self.dkg.handle_round(round, unwrapped)? {
                StepOutcome::Continue(msgs) => Ok(StepOutcome::Continue(
                    msgs.into_iter().map(|m| m.map_payload(Msg::Dkg)).collect(),
                )),
                StepOutcome::Done(core) => {
                    let out = self.start_aux(core)?;
                    Ok(StepOutcome::Continue(
                        out.into_iter().map(|m| m.map_payload(Msg::AuxRound1)).collect(),
                    ))
                }
            };
        }

        match round - 4 {
            0 => {
                let unwrapped = unwrap_all(round, messages, |m| match m {
                    Msg::AuxRound1(inner) => Some(inner),
                    _ => None,
                })?;
                for (j, m) in unwrapped {
                    self.peer_commitments[usize::from(j)] = Some(m.commitment);
                }
                let out = self.open_aux();
                Ok(StepOutcome::Continue(
                    out.into_iter().map(|m| m.map_payload(Msg::AuxRound2)).collect(),
                ))
            }
            1 => {
                let unwrapped = unwrap_all(round, messages, |m| match m {
                    Msg::AuxRound2(inner) => Some(inner),
                    _ => None,
                })?;
                for (j, m) in unwrapped {
                    self.verify_and_store_aux(j, m)?;
                }
                let out = self.prove_mod()?;
                Ok(StepOutcome::Continue(
                    out.into_iter().map(|m| m.map_payload(Msg::AuxRound3)).collect(),
                ))
            }
            2 => {
                let unwrapped = unwrap_all(round, messages, |m| match m {
                    Msg::AuxRound3(inner) => Some(inner),
                    _ => None,
                })?;
                for (j, m) in unwrapped {
                    self.verify_mod(j, &m)?;
                }
                let out = self.prove_fac_and_sch()?;
                Ok(StepOutcome::Continue(
                    out.into_iter().map(|m| m.map_payload(Msg::AuxRound4)).collect(),
                ))
            }
            3 => {
                let unwrapped = unwrap_all(round, messages, |m| match m {
                    Msg::AuxRound4(inner) => Some(inner),
                    _ => None,
                })?;
                for (j, m) in unwrapped {
                    self.verify_fac_and_sch(j, &m)?;
                }
                Ok(StepOutcome::Done(self.finalize()?))
            }
            _ => Err(KeygenError::UnexpectedMessage {
                round,
                sender: u16::MAX,
            }),
        }
    }
}

fn unwrap_all<M, T>(
    round: u16,
    messages: Vec<(u16, M)>,
    f: impl Fn(M) -> Option<T>,
) -> Result<Vec<(u16, T)>, KeygenError> {
    messages
        .into_iter()
        .map(|(j, m)| f(m).ok_or(KeygenError::UnexpectedMessage { round, sender: j }))
        .collect()
}

trait OutMsgExt<M> {
    fn map_payload<N>(self, f: impl FnOnce(M) -> N) -> OutMsg<N>;
}
impl<M> OutMsgExt<M> for OutMsg<M> {
    fn map_payload<N>(self, f: impl FnOnce(M) -> N) -> OutMsg<N> {
        OutMsg {
            recipient: self.recipient,
            payload: f(self.payload),
        }
    }
}

impl<E, L, D, R> Keygen<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    fn n(&self) -> u16 {
        self.core
            .as_ref()
            .map(|c| c.public_shares.len() as u16)
            .unwrap_or(0)
    }

    fn i(&self) -> u16 {
        self.core.as_ref().map(|c| c.i).unwrap_or(0)
    }

    fn start_aux(&mut self, core: IncompleteKeyShare<E, L>) -> Result<Vec<OutMsg<AuxMsgRound1<D>>>, KeygenError> {
        let n = core.public_shares.len();
        self.peer_commitments = vec![None; n];
        self.peer_aux = vec![None; n];
        self.core = Some(core);

        let prep = self
            .pregenerated
            .take()
            .unwrap_or_else(|| PreParams::<L>::generate(&mut self.rng));
        let (p, q) = prep.split();
        let paillier_sk =
            PaillierPrivateKey::from_primes(p.clone(), q.clone()).map_err(|_| KeygenError::PaillierKeygen)?;
        let pedersen_trapdoor =
            PedersenTrapdoor::generate(&p, &q, &mut self.rng).map_err(|_| KeygenError::PedersenKeygen)?;

        let mut y = Scalar::<E>::random(&mut self.rng);
        let big_y = Point::<E>::generator() * y;
        let y = SecretScalar::new(&mut y);

        let mut rid = vec![0u8; L::SECURITY_BYTES];
        self.rng.fill_bytes(&mut rid);

        let (sch_secret, sch_commit) = schnorr_pok::prover_commits_ephemeral_secret::<E, _>(&mut self.rng);

        let pk = paillier_sk.public_key();
        let (commitment, decommit) = HashCommit::<D>::builder()
            .mix_bytes(&self.sid)
            .mix(self.i())
            .mix_bytes(&pk.n.to_bytes())
            .mix_bytes(&pedersen_trapdoor.params.s.to_bytes())
            .mix_bytes(&pedersen_trapdoor.params.t.to_bytes())
            .mix(big_y)
            .mix_bytes(&rid)
            .mix(sch_commit.0)
            .commit(&mut self.rng);

        self.peer_aux[usize::from(self.i())] = Some(PeerAux {
            n: pk.n.clone(),
            s: pedersen_trapdoor.params.s.clone(),
            t: pedersen_trapdoor.params.t.clone(),
            big_y,
            rid: rid.clone(),
            sch_commit: sch_commit.clone(),
        });

        self.paillier_sk = Some(paillier_sk);
        self.pedersen_trapdoor = Some(pedersen_trapdoor);
        self.y = Some(y);
        self.big_y = Some(big_y);
        self.rid = Some(rid);
        self.sch_secret = Some(sch_secret);
        self.sch_commit = Some(sch_commit);
        self.decommit = Some(decommit);

        Ok(vec![OutMsg::broadcast(AuxMsgRound1 { commitment })])
    }

    fn open_aux(&mut self) -> Vec<OutMsg<AuxMsgRound2<E, D>>> {
        let pk = self.paillier_sk.as_ref().expect("set in start_aux").public_key();
        let trapdoor = self.pedersen_trapdoor.as_ref().expect("set in start_aux");
        vec![OutMsg::broadcast(AuxMsgRound2 {
            n: pk.n,
            s: trapdoor.params.s.clone(),
            t: trapdoor.params.t.clone(),
            big_y: self.big_y.expect("set in start_aux"),
            rid: self.rid.clone().expect("set in start_aux"),
            dln_proof: dln_proof::prove::<L, D, _>(&self.sid, trapdoor, &mut self.rng),
            sch_commit: self.sch_commit.clone().expect("set in start_aux"),
            decommit: self.decommit.clone().expect("set in start_aux"),
        })]
    }

    fn verify_and_store_aux(&mut self, j: u16, m: AuxMsgRound2<E, D>) -> Result<(), KeygenError> {
        let commitment = self.peer_commitments[usize::from(j)]
            .clone()
            .ok_or(KeygenError::MissingCommitment { sender: j })?;
        HashCommit::<D>::builder()
            .mix_bytes(&self.sid)
            .mix(j)
            .mix_bytes(&m.n.to_bytes())
            .mix_bytes(&m.s.to_bytes())
            .mix_bytes(&m.t.to_bytes())
            .mix(m.big_y)
            .mix_bytes(&m.rid)
            .mix(m.sch_commit.0)
            .verify(&commitment, &m.decommit)
            .map_err(|_| KeygenError::InvalidDecommitment { sender: j })?;

        let params = PedersenParameters {
            n: m.n.clone(),
            s: m.s.clone(),
            t: m.t.clone(),
        };
        dln_proof::verify::<L, D>(&self.sid, &params, &m.dln_proof)
            .map_err(|_| KeygenError::InvalidDlnProof { sender: j })?;

        self.peer_aux[usize::from(j)] = Some(PeerAux {
            n: m.n,
            s: m.s,
            t: m.t,
            big_y: m.big_y,
            rid: m.rid,
            sch_commit: m.sch_commit,
        });
        Ok(())
    }

    /// Combines every party's `rid` contribution and binds all remaining
    /// proofs in this run to it, so their challenges can't be replayed
    /// across two runs that happen to share a session id.
    fn combined_sid(&mut self) -> &[u8] {
        if self.combined_sid.is_none() {
            let mut combined = self.rid.clone().expect("set in start_aux");
            for (j, aux) in self.peer_aux.iter().enumerate() {
                if j == usize::from(self.i()) {
                    continue;
                }
                let aux = aux.as_ref().expect("populated by round 5");
                xor_bytes(&mut combined, &aux.rid);
            }
            let mut sid = self.sid.clone();
            sid.extend_from_slice(&combined);
            self.combined_sid = Some(sid);
        }
        self.combined_sid.as_deref().expect("just set")
    }

    fn prove_mod(&mut self) -> Result<Vec<OutMsg<AuxMsgRound3>>, KeygenError> {
        let sk = self.paillier_sk.clone().expect("set in start_aux");
        let sid = self.combined_sid().to_vec();
        let proof = paillier_blum_modulus::prove::<L, D, _>(&sid, &sk.public_key().n, sk.p(), sk.q(), &mut self.rng);
        Ok(vec![OutMsg::broadcast(AuxMsgRound3 { mod_proof: proof })])
    }

    fn verify_mod(&mut self, j: u16, m: &AuxMsgRound3) -> Result<(), KeygenError> {
        let n = self.peer_aux[usize::from(j)]
            .as_ref()
            .ok_or(KeygenError::MissingCommitment { sender: j })?
            .n
            .clone();
        let sid = self.combined_sid().to_vec();
        paillier_blum_modulus::verify::<L, D>(&sid, &n, &m.mod_proof)
            .map_err(|_| KeygenError::InvalidModProof { sender: j })
    }

    fn prove_fac_and_sch(&mut self) -> Result<Vec<OutMsg<AuxMsgRound4<E>>>, KeygenError> {
        let sk = self.paillier_sk.clone().expect("set in start_aux");
        let sid = self.combined_sid().to_vec();
        let data = no_small_factor::Data { n: sk.public_key().n };
        let witness = no_small_factor::PrivateData {
            p: sk.p().clone(),
            q: sk.q().clone(),
        };

        let y = *self.y.as_ref().expect("set in start_aux").as_ref();
        let challenge = self.schnorr_challenge(&sid, self.i(), self.big_y.expect("set in start_aux"))?;

        let n = usize::from(self.n());
        let mut out = Vec::with_capacity(n.saturating_sub(1));
        for j in 0..n {
            if j == usize::from(self.i()) {
                continue;
            }
            let peer = self.peer_aux[j].clone().expect("populated by round 5");
            let aux = Aux {
                pedersen: PedersenParameters {
                    n: peer.n,
                    s: peer.s,
                    t: peer.t,
                },
            };
            let fac_proof = no_small_factor::prove::<L, D, _>(&sid, &data, &witness, &aux, &mut self.rng);
            // Recomputed (rather than cloned) per recipient: the ephemeral
            // commitment and challenge are fixed, so this is deterministic
            // and avoids requiring `schnorr_pok::Proof` to implement `Clone`.
            let mut y_copy = y;
            let sch_secret = self.sch_secret.as_ref().expect("set in start_aux");
            let sch_proof = schnorr_pok::prove(sch_secret, &challenge, &SecretScalar::new(&mut y_copy));
            out.push(OutMsg::p2p(j as u16, AuxMsgRound4 { fac_proof, sch_proof }));
        }
        Ok(out)
    }

    fn verify_fac_and_sch(&mut self, j: u16, m: &AuxMsgRound4<E>) -> Result<(), KeygenError> {
        let my_pedersen = self.pedersen_trapdoor.as_ref().expect("set in start_aux").params.clone();
        let peer = self.peer_aux[usize::from(j)]
            .clone()
            .ok_or(KeygenError::MissingCommitment { sender: j })?;

        let sid = self.combined_sid().to_vec();
        let data = no_small_factor::Data { n: peer.n.clone() };
        let aux = Aux { pedersen: my_pedersen };
        no_small_factor::verify::<L, D>(&sid, &data, &aux, &m.fac_proof)
            .map_err(|_| KeygenError::InvalidFacProof { sender: j })?;

        let challenge = self.schnorr_challenge(&sid, j, peer.big_y)?;
        m.sch_proof
            .verify(&peer.sch_commit, &challenge, &peer.big_y)
            .map_err(|_| KeygenError::InvalidSchnorrProof { sender: j })
    }

    fn schnorr_challenge(
        &self,
        sid: &[u8],
        party: u16,
        point: Point<E>,
    ) -> Result<schnorr_pok::Challenge<E>, KeygenError> {
        let tag = Tag::new(sid).ok_or(KeygenError::InvalidTag)?;
        let nonce = Scalar::<E>::hash_concat(
            tag,
            &[b"aux-elgamal", &party.to_be_bytes(), point.to_bytes(true).as_ref()],
        )
        .map_err(|_| KeygenError::HashToScalar)?;
        Ok(schnorr_pok::Challenge { nonce })
    }

    fn finalize(&mut self) -> Result<Valid<KeyShare<E, L>>, KeygenError> {
        let core = self.core.take().expect("populated in start_aux");
        let n = core.public_shares.len();
        let sk = self.paillier_sk.take().expect("set in start_aux");
        let y = self.y.take().expect("set in start_aux");

        let combined_rid = {
            let mut combined = self.rid.clone().expect("set in start_aux");
            for (j, aux) in self.peer_aux.iter().enumerate() {
                if j == usize::from(core.i) {
                    continue;
                }
                xor_bytes(&mut combined, &aux.as_ref().expect("populated by round 5").rid);
            }
            combined
        };
        let mut rid = L::Rid::default();
        let copy_len = rid.as_mut().len().min(combined_rid.len());
        rid.as_mut()[..copy_len].copy_from_slice(&combined_rid[..copy_len]);

        let parties = (0..n)
            .map(|k| {
                let aux = self.peer_aux[k].clone().expect("populated by round 5 for every party");
                PartyAux {
                    N: aux.n,
                    s: aux.s,
                    t: aux.t,
                    Y: aux.big_y,
                }
            })
            .collect();

        let share = KeyShare {
            core: IncompleteKeyShare { rid, ..core },
            p: sk.p().clone(),
            q: sk.q().clone(),
            y,
            parties,
            chain_code: None,
        };
        Valid::try_from(share).map_err(KeygenError::InvalidOutput)
    }
}

#[derive(Debug, Error)]
pub enum KeygenError {
    #[error(transparent)]
    Dkg(#[from] DkgError),
    #[error("paillier key generation failed")]
    PaillierKeygen,
    #[error("pedersen parameter generation failed")]
    PedersenKeygen,
    #[error("missing commitment/aux data from party {sender}")]
    MissingCommitment { sender: u16 },
    #[error("peer {sender}'s dln proof is invalid")]
    InvalidDlnProof { sender: u16 },
    #[error("peer {sender}'s decommitment doesn't match the earlier commitment")]
    InvalidDecommitment { sender: u16 },
    #[error("peer {sender}'s paillier-blum modulus proof is invalid")]
    InvalidModProof { sender: u16 },
    #[error("peer {sender}'s no-small-factor proof is invalid")]
    InvalidFacProof { sender: u16 },
    #[error("peer {sender}'s schnorr proof of its el-gamal key is invalid")]
    InvalidSchnorrProof { sender: u16 },
    #[error("hash-to-curve tag could not be built from session id")]
    InvalidTag,
    #[error("hash-to-scalar failed")]
    HashToScalar,
    #[error("unexpected message for round {round} from party {sender}")]
    UnexpectedMessage { round: u16, sender: u16 },
    #[error("assembled key share failed its own invariant check: {0}")]
    InvalidOutput(#[from] key_share::InvalidKeyShare),
}
