//! BIP32-style non-hardened hierarchical derivation for both supported
//! curves. The offset/chain-code bookkeeping lives in `key_share::hd`; this
//! module supplies the curve-specific HMAC-SHA512 call (distinct domain
//! separator per curve, so a secp256k1 and an ed25519 key derived from the
//! same raw seed never collide) and batches a multi-step path into the
//! single cumulative offset each shareholder applies locally.
//!
//! Hardened indices (`c >= 2^31`) are rejected before any HMAC call: a
//! hardened child requires the unshared private key, which no party in a
//! threshold setting holds.

use generic_ec::{Curve, Point, Scalar};
use hmac::{Hmac, Mac};
use key_share::hd::{self, ChainCode, CumulativeDerivation, DerivationError};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

const SECP256K1_LABEL: &[u8] = b"tss-core/bip32/secp256k1";
const ED25519_LABEL: &[u8] = b"Ed25519 key share derivation:\n";

fn hmac_output(chain_code: &ChainCode, label: &[u8], pk_bytes: &[u8], index: u32) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(chain_code.as_ref()).expect("HMAC accepts any key length");
    mac.update(label);
    mac.update(pk_bytes);
    mac.update(&index.to_be_bytes());
    let out = mac.finalize().into_bytes();
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&out);
    bytes
}

fn check_not_hardened(index: u32) -> Result<(), DerivationError> {
    if hd::is_hardened(index) {
        return Err(DerivationError::HardenedUnsupported);
    }
    Ok(())
}

/// ECDSA (secp256k1, or any `generic_ec::Curve`) derivation.
pub mod ecdsa {
    use super::*;

    /// One non-hardened derivation step from `(parent_pk, chain_code)`.
    pub fn derive_step<E: Curve>(
        parent_pk: &Point<E>,
        chain_code: &ChainCode,
        index: u32,
    ) -> Result<hd::DerivedStep<E>, DerivationError> {
        check_not_hardened(index)?;
        let i_bytes = hmac_output(chain_code, SECP256K1_LABEL, parent_pk.to_bytes(true).as_ref(), index);
        hd::step_from_hmac_output(i_bytes)
    }

    /// Derives the cumulative offset and final chain code for an entire
    /// path, left to right, composing each step's child public key as the
    /// parent of the next.
    pub fn derive_path<E: Curve>(
        root_pk: Point<E>,
        root_chain_code: ChainCode,
        path: &[u32],
    ) -> Result<CumulativeDerivation<E>, DerivationError> {
        let mut pk = root_pk;
        let mut acc = CumulativeDerivation::identity(root_chain_code);
        for &index in path {
            let step = derive_step(&pk, &acc.chain_code, index)?;
            pk = hd::derive_child_public_key(pk, &step.offset);
            acc = acc.extend(step);
        }
        Ok(acc)
    }

    pub use key_share::hd::{derive_child_public_key, derive_child_share};
}

/// EdDSA (ed25519) derivation. Identical offset math to the ECDSA side;
/// only the point/scalar type and the domain-separator label differ.
pub mod eddsa {
    use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
    use curve25519_dalek::edwards::EdwardsPoint;
    use curve25519_dalek::scalar::Scalar;

    use super::*;

    pub struct DerivedStep {
        pub offset: Scalar,
        pub chain_code: ChainCode,
    }

    fn step_from_hmac_output(i_bytes: [u8; 64]) -> Result<DerivedStep, DerivationError> {
        let (i_left, i_right) = i_bytes.split_at(32);
        let mut wide = [0u8; 64];
        wide[..32].copy_from_slice(i_left);
        let offset = Scalar::from_bytes_mod_order_wide(&wide);
        if offset == Scalar::ZERO {
            return Err(DerivationError::ZeroOffset);
        }
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(i_right);
        Ok(DerivedStep {
            offset,
            chain_code: ChainCode(chain_code),
        })
    }

    pub fn derive_step(parent_pk: &EdwardsPoint, chain_code: &ChainCode, index: u32) -> Result<DerivedStep, DerivationError> {
        check_not_hardened(index)?;
        let i_bytes = hmac_output(chain_code, ED25519_LABEL, parent_pk.compress().as_bytes(), index);
        step_from_hmac_output(i_bytes)
    }

    pub fn derive_child_public_key(parent_pk: EdwardsPoint, offset: &Scalar) -> EdwardsPoint {
        parent_pk + offset * ED25519_BASEPOINT_TABLE
    }

    pub fn derive_child_share(parent_share: &Scalar, offset: &Scalar) -> Scalar {
        parent_share + offset
    }

    pub struct CumulativeDerivation {
        pub cumulative_offset: Scalar,
        pub chain_code: ChainCode,
    }

    impl CumulativeDerivation {
        pub fn identity(chain_code: ChainCode) -> Self {
            Self {
                cumulative_offset: Scalar::ZERO,
                chain_code,
            }
        }

        pub fn extend(self, step: DerivedStep) -> Self {
            Self {
                cumulative_offset: self.cumulative_offset + step.offset,
                chain_code: step.chain_code,
            }
        }
    }

    pub fn derive_path(root_pk: EdwardsPoint, root_chain_code: ChainCode, path: &[u32]) -> Result<CumulativeDerivation, DerivationError> {
        let mut pk = root_pk;
        let mut acc = CumulativeDerivation::identity(root_chain_code);
        for &index in path {
            let step = derive_step(&pk, &acc.chain_code, index)?;
            pk = derive_child_public_key(pk, &step.offset);
            acc = acc.extend(step);
        }
        Ok(acc)
    }
}
