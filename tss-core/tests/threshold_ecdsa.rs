//! End-to-end coverage of `(t, n)` threshold ECDSA: keygen, resharing (same
//! party set and an expanding one), and signing across qualifying and
//! non-qualifying subsets. Mirrors the seed scenarios in spec.md §8.

mod common;

use common::run_protocol;
use digest::Digest;
use generic_ec::Scalar;
use key_share::security_level::DevelopmentOnly;
use key_share::{KeyShare, Valid};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use tss_core::supported_curves::Secp256k1;
use tss_core::threshold_ecdsa::keygen::Keygen;
use tss_core::threshold_ecdsa::reshare;
use tss_core::threshold_ecdsa::sign::{combine_signature, sigma_contribution, Presign};

type Kg = Keygen<Secp256k1, DevelopmentOnly, Sha256, ChaCha20Rng>;
type Ps = Presign<Secp256k1, DevelopmentOnly, Sha256, ChaCha20Rng>;

fn hash_message(msg: &[u8]) -> Scalar<Secp256k1> {
    let digest = Sha256::digest(msg);
    Scalar::<Secp256k1>::from_be_bytes_mod_order(&digest)
}

fn dkg_rng(seed: u64, i: u16) -> (ChaCha20Rng, ChaCha20Rng) {
    (
        ChaCha20Rng::seed_from_u64(seed * 1000 + u64::from(i) * 2),
        ChaCha20Rng::seed_from_u64(seed * 1000 + u64::from(i) * 2 + 1),
    )
}

fn run_dkg(seed: u64, sid: &[u8], n: u16, t: u16) -> Vec<Valid<KeyShare<Secp256k1, DevelopmentOnly>>> {
    let parties: Vec<Kg> = (0..n)
        .map(|i| {
            let (rng_dkg, rng_aux) = dkg_rng(seed, i);
            Kg::new(i, n, t, sid.to_vec(), rng_dkg, rng_aux)
        })
        .collect();
    run_protocol(parties)
}

/// Drives a presign round over `subset` and returns each participant's
/// contribution in `subset` order, without yet assuming the subset
/// actually qualifies (size >= t).
fn run_presign(
    shares: &[Valid<KeyShare<Secp256k1, DevelopmentOnly>>],
    subset: &[u16],
    seed: u64,
    sid: &[u8],
) -> Vec<tss_core::threshold_ecdsa::sign::Presignature<Secp256k1>> {
    let parties: Vec<Ps> = subset
        .iter()
        .enumerate()
        .map(|(pos, &global)| {
            let share = shares[usize::from(global)].clone();
            let rng = ChaCha20Rng::seed_from_u64(seed * 1000 + pos as u64);
            Ps::new(share, subset.to_vec(), sid.to_vec(), rng).expect("party is in subset")
        })
        .collect();
    run_protocol(parties)
}

#[test]
fn dkg_then_any_pair_can_sign() {
    let sid = b"threshold-ecdsa/dkg-any-pair".to_vec();
    let shares = run_dkg(1, &sid, 3, 2);
    assert_eq!(shares.len(), 3);
    let y = shares[0].core.shared_public_key;
    for s in &shares {
        assert_eq!(s.core.shared_public_key, y);
        assert!(s.validate().is_ok());
    }

    let message = hash_message(b"hello");
    for (a, b) in [(0u16, 1u16), (0, 2), (1, 2)] {
        let subset = vec![a, b];
        let sign_sid = format!("threshold-ecdsa/sign/{a}-{b}").into_bytes();
        let presigs = run_presign(&shares, &subset, 10 + u64::from(a) * 10 + u64::from(b), &sign_sid);
        let r = presigs[0].r;
        let sigmas: Vec<_> = presigs.iter().map(|p| sigma_contribution(p, message)).collect();
        let sig = combine_signature(message, y, r, &sigmas).expect("valid pairing must produce a verifying signature");
        assert_eq!(sig.r, r);
    }
}

#[test]
fn reshare_same_party_set_preserves_public_key() {
    let sid = b"threshold-ecdsa/reshare-same-set".to_vec();
    let shares = run_dkg(2, &sid, 3, 2);
    let y = shares[0].core.shared_public_key;

    // Party 0 and 1 reconstruct their Lagrange-weighted contribution from
    // the old (2,3) sharing; party 2 (still part of the new set) passes a
    // zero constant term, per the reshare design note.
    let old_subset = [0u16, 1u16];
    let reshare_sid = b"threshold-ecdsa/reshare-same-set/session".to_vec();
    let new_n = 3u16;
    let new_t = 2u16;

    let mut parties: Vec<Kg> = Vec::with_capacity(3);
    for i in 0..new_n {
        let (rng_dkg, rng_aux) = dkg_rng(3, i);
        let protocol = if old_subset.contains(&i) {
            reshare::for_outgoing_party(&shares[usize::from(i)], &old_subset, i, new_n, new_t, reshare_sid.clone(), rng_dkg, rng_aux)
                .expect("party is a member of old_subset")
        } else {
            reshare::for_incoming_party(i, new_n, new_t, reshare_sid.clone(), rng_dkg, rng_aux)
        };
        parties.push(protocol);
    }

    let new_shares = run_protocol(parties);
    for s in &new_shares {
        assert!(s.validate().is_ok());
        assert_eq!(s.core.shared_public_key, y, "reshare must not change the shared public key");
    }

    let message = hash_message("reshared-same-set".as_bytes());
    let subset = vec![0u16, 1u16];
    let presigs = run_presign(&new_shares, &subset, 40, b"threshold-ecdsa/reshare-same-set/sign");
    let r = presigs[0].r;
    let sigmas: Vec<_> = presigs.iter().map(|p| sigma_contribution(p, message)).collect();
    combine_signature(message, y, r, &sigmas).expect("reshared key must still sign correctly");
}

#[test]
fn reshare_to_larger_group_any_qualifying_subset_can_sign_but_smaller_cannot() {
    let sid = b"threshold-ecdsa/reshare-grow".to_vec();
    let shares = run_dkg(4, &sid, 3, 2);
    let y = shares[0].core.shared_public_key;

    let old_subset = [0u16, 1u16];
    let reshare_sid = b"threshold-ecdsa/reshare-grow/session".to_vec();
    let new_n = 5u16;
    let new_t = 3u16;

    let mut parties: Vec<Kg> = Vec::with_capacity(usize::from(new_n));
    for i in 0..new_n {
        let (rng_dkg, rng_aux) = dkg_rng(5, i);
        let protocol = if i < 3 && old_subset.contains(&i) {
            reshare::for_outgoing_party(&shares[usize::from(i)], &old_subset, i, new_n, new_t, reshare_sid.clone(), rng_dkg, rng_aux)
                .expect("party is a member of old_subset")
        } else {
            reshare::for_incoming_party(i, new_n, new_t, reshare_sid.clone(), rng_dkg, rng_aux)
        };
        parties.push(protocol);
    }

    let new_shares = run_protocol(parties);
    assert_eq!(new_shares.len(), 5);
    for s in &new_shares {
        assert!(s.validate().is_ok());
        assert_eq!(s.core.shared_public_key, y);
    }

    let message = hash_message(b"grown-group-message");

    // Any qualifying (size-3) subset signs successfully.
    for subset in [[0u16, 1, 2], [1, 2, 3], [2, 3, 4], [0, 3, 4]] {
        let sign_sid = format!("threshold-ecdsa/reshare-grow/sign/{subset:?}").into_bytes();
        let presigs = run_presign(&new_shares, &subset, 60 + subset[0] as u64, &sign_sid);
        let r = presigs[0].r;
        let sigmas: Vec<_> = presigs.iter().map(|p| sigma_contribution(p, message)).collect();
        combine_signature(message, y, r, &sigmas)
            .unwrap_or_else(|e| panic!("qualifying subset {subset:?} must sign: {e}"));
    }

    // A below-threshold subset (size 2 < t=3) must not produce a signature
    // that verifies under Y: the Lagrange reconstruction over too few
    // points does not recover the true secret.
    let short_subset = [0u16, 1u16];
    let presigs = run_presign(&new_shares, &short_subset, 99, b"threshold-ecdsa/reshare-grow/sign/short");
    let r = presigs[0].r;
    let sigmas: Vec<_> = presigs.iter().map(|p| sigma_contribution(p, message)).collect();
    assert!(
        combine_signature(message, y, r, &sigmas).is_err(),
        "a below-threshold subset must not be able to produce a valid signature"
    );
}
