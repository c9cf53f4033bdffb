//! End-to-end coverage of threshold EdDSA (ed25519): DKG followed by
//! signing over a message, checked against a standard Ed25519 verifier.
//! Mirrors spec.md §8 scenario 5.

mod common;

use common::run_protocol;
use ed25519_dalek::{Signature, VerifyingKey};
use key_share::eddsa::KeyShareEddsa;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use tss_core::eddsa::keygen::Dkg;
use tss_core::eddsa::sign::Sign;

type Kg = Dkg<Sha256, ChaCha20Rng>;
type Sg = Sign<Sha256, ChaCha20Rng>;

fn run_dkg(seed: u64, sid: &[u8], n: u16, t: u16) -> Vec<KeyShareEddsa> {
    let parties: Vec<Kg> = (0..n)
        .map(|i| Kg::new(i, n, t, sid.to_vec(), ChaCha20Rng::seed_from_u64(seed * 1000 + u64::from(i))))
        .collect();
    run_protocol(parties)
}

#[test]
fn dkg_then_any_qualifying_subset_can_sign() {
    let sid = b"eddsa/dkg".to_vec();
    let shares = run_dkg(1, &sid, 3, 2);
    assert_eq!(shares.len(), 3);
    let y = shares[0].shared_public_key;
    for s in &shares {
        assert_eq!(s.shared_public_key, y);
        assert!(s.validate().is_ok());
    }

    let message = b"a 32-byte-or-longer test message".to_vec();
    for (a, b) in [(0u16, 1u16), (0, 2), (1, 2)] {
        let subset = vec![a, b];
        let sign_sid = format!("eddsa/sign/{a}-{b}").into_bytes();
        let parties: Vec<Sg> = subset
            .iter()
            .enumerate()
            .map(|(pos, &global)| {
                Sg::new(
                    shares[usize::from(global)].clone(),
                    subset.clone(),
                    message.clone(),
                    sign_sid.clone(),
                    ChaCha20Rng::seed_from_u64(300 + pos as u64),
                )
                .expect("party is in subset")
            })
            .collect();
        let outputs = run_protocol(parties);
        let signature: Signature = outputs[0];
        assert_eq!(signature, outputs[1]);

        let verifying_key = VerifyingKey::from_bytes(y.compress().as_bytes()).unwrap();
        verifying_key
            .verify_strict(&message, &signature)
            .expect("signature produced by the threshold protocol must verify under a stock ed25519 verifier");
    }
}

#[test]
fn mock_keygen_eddsa_shares_can_sign() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let shares = tss_core::trusted_dealer::mock_keygen_eddsa(&mut rng, 2, 3).unwrap();
    let y = shares[0].shared_public_key;

    let message = b"signed via a trusted-dealer fixture".to_vec();
    let subset = vec![0u16, 2u16];
    let sid = b"eddsa/mock-sign".to_vec();
    let parties: Vec<Sg> = subset
        .iter()
        .enumerate()
        .map(|(pos, &global)| {
            Sg::new(
                shares[usize::from(global)].clone(),
                subset.clone(),
                message.clone(),
                sid.clone(),
                ChaCha20Rng::seed_from_u64(400 + pos as u64),
            )
            .unwrap()
        })
        .collect();
    let outputs = run_protocol(parties);
    let verifying_key = VerifyingKey::from_bytes(y.compress().as_bytes()).unwrap();
    verifying_key.verify_strict(&message, &outputs[0]).unwrap();
}
