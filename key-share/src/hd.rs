//! BIP32-style non-hardened hierarchical derivation, shared by whichever
//! curve-specific derivation code builds on top of it (`tss_core::bip32`).
//!
//! Only the additive-offset bookkeeping lives here: `ChainCode`, the
//! "is this index hardened" check, and cumulative-offset composition along
//! a path. The HMAC-SHA512 call and the curve-specific domain-separation
//! label are the caller's job, since one curve (secp256k1, via `generic-ec`)
//! and the other (ed25519, via `curve25519-dalek`) don't share a point/
//! scalar type in this workspace.

use generic_ec::{Curve, Point, Scalar};
use thiserror::Error;

/// BIP32 chain code: 32 bytes of entropy combined with a parent key and a
/// child index to derive the next offset and chain code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChainCode(pub [u8; 32]);

impl AsRef<[u8]> for ChainCode {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Maximum non-hardened child index (`2^31 - 1`); anything at or above
/// `2^31` requires the unshared private key and is therefore unsupported.
pub const HARDENED_INDEX_BOUNDARY: u32 = 1 << 31;

pub fn is_hardened(index: u32) -> bool {
    index >= HARDENED_INDEX_BOUNDARY
}

#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("hardened derivation is unsupported: it requires the unshared private key")]
    HardenedUnsupported,
    #[error("derived offset is zero, which would leave the child key unchanged")]
    ZeroOffset,
}

/// A single derivation step's output: the offset to add to every
/// shareholder's secret share (and to the aggregate public key), plus the
/// child chain code.
pub struct DerivedStep<E: Curve> {
    pub offset: Scalar<E>,
    pub chain_code: ChainCode,
}

/// Turns the 64-byte HMAC-SHA512 output `I` (already computed by the
/// caller over the curve-specific label, parent public key, and index)
/// into an offset + chain code pair, enforcing `offset != 0`.
pub fn step_from_hmac_output<E: Curve>(i_bytes: [u8; 64]) -> Result<DerivedStep<E>, DerivationError> {
    let (i_left, i_right) = i_bytes.split_at(32);
    let offset = Scalar::<E>::from_be_bytes_mod_order(i_left);
    if offset.is_zero() {
        return Err(DerivationError::ZeroOffset);
    }
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(i_right);
    Ok(DerivedStep {
        offset,
        chain_code: ChainCode(chain_code),
    })
}

/// Applies a derivation step to a parent public key: `child_pk = pk + offset * G`.
pub fn derive_child_public_key<E: Curve>(parent_pk: Point<E>, offset: &Scalar<E>) -> Point<E> {
    parent_pk + Point::generator() * offset
}

/// Applies a derivation step to a local secret share:
/// `child_share_i = parent_share_i + offset` (mod q).
///
/// Only one shareholder's share needs the full offset added once; every
/// shareholder applies the same offset locally, which keeps the additive
/// relationship `sum(child_share_i * lambda_i) = child_sk` intact without
/// any interaction.
pub fn derive_child_share<E: Curve>(
    parent_share: &Scalar<E>,
    offset: &Scalar<E>,
) -> Scalar<E> {
    parent_share + offset
}

/// Accumulates offsets and chain codes along a path, left to right. Returns
/// the cumulative offset (`sum of per-step offsets mod q`) and the final
/// chain code, so that `Y_child = Y_parent + cumulative_offset * G` and
/// each shareholder can apply the cumulative offset in a single step
/// instead of replaying the whole path.
pub struct CumulativeDerivation<E: Curve> {
    pub cumulative_offset: Scalar<E>,
    pub chain_code: ChainCode,
}

impl<E: Curve> CumulativeDerivation<E> {
    pub fn identity(chain_code: ChainCode) -> Self {
        Self {
            cumulative_offset: Scalar::zero(),
            chain_code,
        }
    }

    pub fn extend(self, step: DerivedStep<E>) -> Self {
        Self {
            cumulative_offset: self.cumulative_offset + step.offset,
            chain_code: step.chain_code,
        }
    }
}
