//! End-to-end coverage of two-party (Lindell-style) ECDSA: keygen followed
//! by signing, checked against a standard ECDSA verification equation.
//! Mirrors spec.md §8 scenario 2.

mod common;

use common::run_protocol;
use digest::Digest;
use generic_ec::Scalar;
use key_share::security_level::DevelopmentOnly;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use tss_core::supported_curves::Secp256k1;
use tss_core::twoparty::keygen::{Keygen, Output as KeygenOutput};
use tss_core::twoparty::sign::{verify_ecdsa, Output as SignOutput, Sign};
use tss_core::twoparty::Role;

type Kg = Keygen<Secp256k1, DevelopmentOnly, Sha256, ChaCha20Rng>;
type Sg = Sign<Secp256k1, ChaCha20Rng>;

fn hash_message(msg: &[u8]) -> Scalar<Secp256k1> {
    let digest = Sha256::digest(msg);
    Scalar::<Secp256k1>::from_be_bytes_mod_order(&digest)
}

#[test]
fn two_party_keygen_then_sign_verifies() {
    let sid = b"twoparty/keygen".to_vec();
    let p1 = Kg::new(Role::P1, sid.clone(), ChaCha20Rng::seed_from_u64(100));
    let p2 = Kg::new(Role::P2, sid, ChaCha20Rng::seed_from_u64(101));
    let outputs = run_protocol(vec![p1, p2]);

    let (share1, share2) = match (&outputs[0], &outputs[1]) {
        (KeygenOutput::P1(a), KeygenOutput::P2(b)) => (a.clone(), b.clone()),
        _ => panic!("expected (P1, P2) in party order"),
    };
    assert_eq!(share1.shared_public_key, share2.shared_public_key);

    let message = hash_message(b"test");
    let sign_sid = b"twoparty/sign".to_vec();
    let sp1 = Sg::new_p1(sign_sid.clone(), message, share1.clone(), ChaCha20Rng::seed_from_u64(200));
    let sp2 = Sg::new_p2(sign_sid, message, share2, ChaCha20Rng::seed_from_u64(201));
    let sign_outputs = run_protocol(vec![sp1, sp2]);

    let signature = match &sign_outputs[0] {
        SignOutput::P1(sig) => *sig,
        SignOutput::P2 => panic!("p1's output must carry the signature"),
    };
    assert!(matches!(sign_outputs[1], SignOutput::P2));
    verify_ecdsa::<Secp256k1>(message, signature.r, signature.s, share1.shared_public_key)
        .expect("assembled signature must verify against the shared public key");
}

#[test]
fn two_party_keygen_then_sign_different_message_fails_old_signature() {
    let sid = b"twoparty/keygen-2".to_vec();
    let p1 = Kg::new(Role::P1, sid.clone(), ChaCha20Rng::seed_from_u64(110));
    let p2 = Kg::new(Role::P2, sid, ChaCha20Rng::seed_from_u64(111));
    let outputs = run_protocol(vec![p1, p2]);
    let (share1, share2) = match (&outputs[0], &outputs[1]) {
        (KeygenOutput::P1(a), KeygenOutput::P2(b)) => (a.clone(), b.clone()),
        _ => panic!("expected (P1, P2) in party order"),
    };

    let message = hash_message(b"hello");
    let other_message = hash_message(b"goodbye");
    let sign_sid = b"twoparty/sign-2".to_vec();
    let sp1 = Sg::new_p1(sign_sid.clone(), message, share1.clone(), ChaCha20Rng::seed_from_u64(210));
    let sp2 = Sg::new_p2(sign_sid, message, share2, ChaCha20Rng::seed_from_u64(211));
    let sign_outputs = run_protocol(vec![sp1, sp2]);
    let signature = match &sign_outputs[0] {
        SignOutput::P1(sig) => *sig,
        SignOutput::P2 => panic!("p1's output must carry the signature"),
    };

    assert!(verify_ecdsa::<Secp256k1>(other_message, signature.r, signature.s, share1.shared_public_key).is_err());
}
