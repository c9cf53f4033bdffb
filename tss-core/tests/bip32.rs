//! BIP32-style non-hardened derivation: a batch path equals the composition
//! of individual steps, and hardened indices are rejected outright, for
//! both supported curves. Mirrors spec.md §8 scenario 6.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::scalar::Scalar as EdScalar;
use generic_ec::{Point, Scalar};
use key_share::hd::{ChainCode, DerivationError, HARDENED_INDEX_BOUNDARY};
use tss_core::bip32::{ecdsa, eddsa};
use tss_core::supported_curves::Secp256k1;

fn chain_code(byte: u8) -> ChainCode {
    ChainCode([byte; 32])
}

#[test]
fn ecdsa_batch_path_matches_sequential_single_steps() {
    let root_sk = Scalar::<Secp256k1>::from(12345u64);
    let root_pk = Point::<Secp256k1>::generator() * root_sk;
    let root_cc = chain_code(7);
    let path = [0u32, 1u32, 2u32];

    let batched = ecdsa::derive_path(root_pk, root_cc, &path).unwrap();

    let mut pk = root_pk;
    let mut cc = root_cc;
    let mut cumulative = Scalar::<Secp256k1>::zero();
    for &index in &path {
        let step = ecdsa::derive_step(&pk, &cc, index).unwrap();
        pk = ecdsa::derive_child_public_key(pk, &step.offset);
        cc = step.chain_code;
        cumulative = cumulative + step.offset;
    }

    assert_eq!(batched.cumulative_offset, cumulative);
    assert_eq!(batched.chain_code, cc);

    let batched_child_pk = ecdsa::derive_child_public_key(root_pk, &batched.cumulative_offset);
    assert_eq!(batched_child_pk, pk);

    let child_sk = ecdsa::derive_child_share(&root_sk, &batched.cumulative_offset);
    assert_eq!(Point::<Secp256k1>::generator() * child_sk, batched_child_pk);
}

#[test]
fn ecdsa_hardened_index_is_rejected() {
    let root_sk = Scalar::<Secp256k1>::from(1u64);
    let root_pk = Point::<Secp256k1>::generator() * root_sk;
    let cc = chain_code(1);

    let err = ecdsa::derive_step(&root_pk, &cc, HARDENED_INDEX_BOUNDARY).unwrap_err();
    assert!(matches!(err, DerivationError::HardenedUnsupported));

    let err = ecdsa::derive_path(root_pk, cc, &[0, HARDENED_INDEX_BOUNDARY + 5]).unwrap_err();
    assert!(matches!(err, DerivationError::HardenedUnsupported));
}

#[test]
fn eddsa_batch_path_matches_sequential_single_steps() {
    let root_sk = EdScalar::from_bytes_mod_order([9u8; 32]);
    let root_pk = &root_sk * ED25519_BASEPOINT_TABLE;
    let root_cc = chain_code(3);
    let path = [0u32, 1u32, 2u32];

    let batched = eddsa::derive_path(root_pk, root_cc, &path).unwrap();

    let mut pk = root_pk;
    let mut cc = root_cc;
    let mut cumulative = EdScalar::ZERO;
    for &index in &path {
        let step = eddsa::derive_step(&pk, &cc, index).unwrap();
        pk = eddsa::derive_child_public_key(pk, &step.offset);
        cc = step.chain_code;
        cumulative = cumulative + step.offset;
    }

    assert_eq!(batched.cumulative_offset, cumulative);
    assert_eq!(batched.chain_code, cc);

    let batched_child_pk = eddsa::derive_child_public_key(root_pk, &batched.cumulative_offset);
    assert_eq!(batched_child_pk, pk);

    let child_sk = eddsa::derive_child_share(&root_sk, &batched.cumulative_offset);
    assert_eq!(&child_sk * ED25519_BASEPOINT_TABLE, batched_child_pk);
}

#[test]
fn eddsa_hardened_index_is_rejected() {
    let root_sk = EdScalar::from_bytes_mod_order([2u8; 32]);
    let root_pk = &root_sk * ED25519_BASEPOINT_TABLE;
    let cc = chain_code(9);

    let err = eddsa::derive_step(&root_pk, &cc, HARDENED_INDEX_BOUNDARY).unwrap_err();
    assert!(matches!(err, DerivationError::HardenedUnsupported));
}
