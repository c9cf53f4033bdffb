//! Resharing: moves a `(t, n)` key share onto a (possibly different) `(t',
//! n')` party set without changing the shared public key.
//!
//! Grounded on the same observation the teacher's key-refresh round makes
//! about additive blinding (a DKG whose constant terms are chosen to sum to
//! a known target rather than to a fresh random secret): running
//! [`threshold_keygen::Dkg::new_with_constant_term`] with each old
//! shareholder's constant term set to its Lagrange-weighted contribution to
//! the secret — and brand-new parties contributing zero — reconstructs the
//! exact same secret under the new sharing. This module is a thin builder
//! around [`super::keygen::Keygen`]; the round shape is identical, so no new
//! `Protocol` impl is needed.

use digest::Digest;
use generic_ec::{hash_to_curve::FromHash, Curve, Scalar};
use key_share::{security_level::SecurityLevel, vss, KeyShare, Valid};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use super::keygen::Keygen;

/// Party `i`'s contribution to a reshare: its current Lagrange-weighted
/// share of the secret, or `None` if it's a brand-new party joining the
/// sharing with no prior key material.
pub fn constant_term_for_outgoing<E, L>(
    share: &Valid<KeyShare<E, L>>,
    old_subset: &[u16],
) -> Result<Scalar<E>, ReshareError>
where
    E: Curve,
    L: SecurityLevel,
{
    let i = share.core.i;
    if !old_subset.contains(&i) {
        return Err(ReshareError::NotInOldSubset { party: i });
    }
    let eval_points: Vec<Scalar<E>> = old_subset.iter().map(|&k| eval_point::<E>(k)).collect();
    let lambda = vss::lagrange_coefficient(&eval_points, eval_point::<E>(i))
        .ok_or(ReshareError::DegenerateSubset)?;
    Ok(lambda * share.core.x.as_ref())
}

fn eval_point<E: Curve>(k: u16) -> Scalar<E> {
    Scalar::<E>::from(u64::from(k) + 1)
}

/// Builds the reshare operation for a party that currently holds a share.
/// `old_subset` must list exactly `t_old` of the current shareholders
/// (including `share.core.i`); any qualifying subset works, since all of
/// them reconstruct the same secret.
#[allow(clippy::too_many_arguments)]
pub fn for_outgoing_party<E, L, D, R>(
    share: &Valid<KeyShare<E, L>>,
    old_subset: &[u16],
    new_i: u16,
    new_n: u16,
    new_t: u16,
    sid: Vec<u8>,
    rng_dkg: R,
    rng_aux: R,
) -> Result<Keygen<E, L, D, R>, ReshareError>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    let constant_term = constant_term_for_outgoing(share, old_subset)?;
    Ok(Keygen::new_reshare(
        new_i,
        new_n,
        new_t,
        sid,
        constant_term,
        rng_dkg,
        rng_aux,
    ))
}

/// Builds the reshare operation for a party joining the new set with no
/// prior key material: it contributes a zero constant term, so the sum the
/// new set reconstructs is unaffected.
pub fn for_incoming_party<E, L, D, R>(
    new_i: u16,
    new_n: u16,
    new_t: u16,
    sid: Vec<u8>,
    rng_dkg: R,
    rng_aux: R,
) -> Keygen<E, L, D, R>
where
    E: Curve,
    L: SecurityLevel,
    D: Digest<OutputSize = digest::typenum::U32> + Clone,
    R: RngCore + CryptoRng,
    Scalar<E>: FromHash,
{
    Keygen::new_reshare(new_i, new_n, new_t, sid, Scalar::<E>::zero(), rng_dkg, rng_aux)
}

#[derive(Debug, Error)]
pub enum ReshareError {
    #[error("party {party} is not a member of the declared old subset")]
    NotInOldSubset { party: u16 },
    #[error("old subset is degenerate (duplicate evaluation points)")]
    DegenerateSubset,
}
