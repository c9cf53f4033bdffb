//! DLN proof: proves a set of [`PedersenParameters`] is well-formed, i.e.
//! that `t = s^lambda mod N` for a `lambda` the prover knows, run as
//! `SECURITY_BYTES * 8` parallel one-bit-challenge repetitions compressed
//! into a single Fiat-Shamir transcript. Bundled with every
//! [`crate::paillier::PreParams`] a party publishes.
//!
//! Grounded on the teacher's `ring_pedersen_parameters` proof, the one
//! proof module the teacher itself implements directly (everything else
//! the teacher pulls in from its `paillier-zk` dependency).

use digest::Digest;
use key_share::security_level::SecurityLevel;
use libpaillier::unknown_order::BigNumber;
use rand_core::{CryptoRng, RngCore};

use crate::pedersen::{PedersenParameters, PedersenTrapdoor};

use super::challenge::{InvalidProof, Transcript};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Proof {
    commitments: Vec<BigNumber>,
    responses: Vec<BigNumber>,
}

/// Number of parallel repetitions; matches the generating party's rid
/// length so the proof's soundness error is negligible at the same
/// security level as the rest of that party's contributions.
fn repetitions<L: SecurityLevel>() -> usize {
    L::SECURITY_BITS
}

pub fn prove<L: SecurityLevel, D: Digest, R: RngCore + CryptoRng>(
    sid: &[u8],
    trapdoor: &PedersenTrapdoor,
    rng: &mut R,
) -> Proof {
    let m = repetitions::<L>();
    let phi_n = trapdoor.phi_n();
    let t = &trapdoor.params.t;
    let n = &trapdoor.params.n;

    let blinds: Vec<BigNumber> = (0..m).map(|_| BigNumber::from_rng(phi_n, rng)).collect();
    let commitments: Vec<BigNumber> = blinds.iter().map(|r| t.modpow(r, n)).collect();

    let mut transcript = Transcript::<D>::new(sid);
    transcript
        .mix_bignumber(&trapdoor.params.n)
        .mix_bignumber(&trapdoor.params.s)
        .mix_bignumber(&trapdoor.params.t);
    for c in &commitments {
        transcript.mix_bignumber(c);
    }
    let bits = transcript.challenge_bits(m);

    let responses: Vec<BigNumber> = blinds
        .iter()
        .zip(&bits)
        .map(|(r, &bit)| if bit { (r + trapdoor.lambda()) % phi_n } else { r.clone() })
        .collect();

    Proof { commitments, responses }
}

pub fn verify<L: SecurityLevel, D: Digest>(sid: &[u8], params: &PedersenParameters, proof: &Proof) -> Result<(), InvalidProof> {
    let m = repetitions::<L>();
    if proof.commitments.len() != m || proof.responses.len() != m {
        return Err(InvalidProof("wrong repetition count"));
    }

    let mut transcript = Transcript::<D>::new(sid);
    transcript
        .mix_bignumber(&params.n)
        .mix_bignumber(&params.s)
        .mix_bignumber(&params.t);
    for c in &proof.commitments {
        transcript.mix_bignumber(c);
    }
    let bits = transcript.challenge_bits(m);

    for ((commitment, response), bit) in proof.commitments.iter().zip(&proof.responses).zip(&bits) {
        let lhs = params.t.modpow(response, &params.n);
        let rhs = if *bit {
            commitment.modmul(&params.s, &params.n)
        } else {
            commitment.clone()
        };
        if lhs != rhs {
            return Err(InvalidProof("dln repetition check failed"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use key_share::security_level::DevelopmentOnly;
    use rand_chacha::rand_core::SeedableRng;
    use sha2::Sha256;

    #[test]
    fn roundtrip() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(3);
        let prep = crate::paillier::PreParams::<DevelopmentOnly>::generate(&mut rng);
        let (p, q) = prep.split();
        let trapdoor = PedersenTrapdoor::generate(&p, &q, &mut rng).unwrap();

        let proof = prove::<DevelopmentOnly, Sha256, _>(b"sid", &trapdoor, &mut rng);
        verify::<DevelopmentOnly, Sha256>(b"sid", &trapdoor.params, &proof).unwrap();
    }
}
