//! Schnorr proof of knowledge of a discrete log, over either curve this
//! crate supports. ECDSA-side protocols delegate directly to
//! `generic_ec_zkp::schnorr_pok` (the teacher's own dependency, already
//! used by `threshold-keygen`'s DKG); EdDSA has no equivalent crate in the
//! workspace's curve25519-dalek-based stack, so its half is implemented by
//! hand in the same Sigma-protocol shape.

pub mod ecdsa {
    pub use generic_ec_zkp::schnorr_pok::*;
}

pub mod eddsa {
    use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
    use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
    use curve25519_dalek::scalar::Scalar;
    use digest::Digest;
    use rand_core::{CryptoRng, RngCore};

    use crate::zk::challenge::{InvalidProof, Transcript};

    #[derive(Clone, serde::Serialize, serde::Deserialize)]
    pub struct Proof {
        r: CompressedEdwardsY,
        s: Scalar,
    }

    pub fn prove<D: Digest, R: RngCore + CryptoRng>(sid: &[u8], x: &Scalar, public: &EdwardsPoint, rng: &mut R) -> Proof {
        let mut k_bytes = [0u8; 32];
        rng.fill_bytes(&mut k_bytes);
        let k = Scalar::from_bytes_mod_order(k_bytes);
        let r_point = &k * ED25519_BASEPOINT_TABLE;

        let mut t = Transcript::<D>::new(sid);
        t.mix_bytes(r_point.compress().as_bytes())
            .mix_bytes(public.compress().as_bytes());
        let e_bytes = t.challenge_bignumber(256).to_bytes();
        let mut e_arr = [0u8; 32];
        let start = 32 - e_bytes.len().min(32);
        e_arr[start..].copy_from_slice(&e_bytes[e_bytes.len().saturating_sub(32)..]);
        let e = Scalar::from_bytes_mod_order(e_arr);

        let s = k + e * x;
        Proof {
            r: r_point.compress(),
            s,
        }
    }

    pub fn verify<D: Digest>(sid: &[u8], public: &EdwardsPoint, proof: &Proof) -> Result<(), InvalidProof> {
        let r_point = proof
            .r
            .decompress()
            .ok_or(InvalidProof("commitment point is not a valid curve point"))?;

        let mut t = Transcript::<D>::new(sid);
        t.mix_bytes(proof.r.as_bytes()).mix_bytes(public.compress().as_bytes());
        let e_bytes = t.challenge_bignumber(256).to_bytes();
        let mut e_arr = [0u8; 32];
        let start = 32 - e_bytes.len().min(32);
        e_arr[start..].copy_from_slice(&e_bytes[e_bytes.len().saturating_sub(32)..]);
        let e = Scalar::from_bytes_mod_order(e_arr);

        let lhs = &proof.s * ED25519_BASEPOINT_TABLE;
        let rhs = r_point + e * public;
        if lhs != rhs {
            return Err(InvalidProof("schnorr verification equation failed"));
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rand_chacha::rand_core::SeedableRng;
        use sha2::Sha256;

        #[test]
        fn honest_proof_verifies() {
            let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(70);
            let x = Scalar::from_bytes_mod_order(rand_bytes(&mut rng));
            let public = &x * ED25519_BASEPOINT_TABLE;
            let proof = prove::<Sha256, _>(b"sid", &x, &public, &mut rng);
            verify::<Sha256>(b"sid", &public, &proof).unwrap();
        }

        #[test]
        fn wrong_public_key_is_rejected() {
            let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(71);
            let x = Scalar::from_bytes_mod_order(rand_bytes(&mut rng));
            let public = &x * ED25519_BASEPOINT_TABLE;
            let proof = prove::<Sha256, _>(b"sid", &x, &public, &mut rng);

            let other_public = public + ED25519_BASEPOINT_TABLE.basepoint();
            assert!(verify::<Sha256>(b"sid", &other_public, &proof).is_err());
        }

        fn rand_bytes<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 32] {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            bytes
        }
    }
}
