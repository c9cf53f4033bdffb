//! Key share types produced by the two-party (Lindell-style) ECDSA keygen
//! protocol (`tss_core::twoparty::keygen`). Unlike the threshold `KeyShare`,
//! the two parties end up holding asymmetric state: P1 keeps the Paillier
//! private key, P2 keeps P1's share Paillier-encrypted.

use generic_ec::{Curve, Point, SecretScalar};
use libpaillier::unknown_order::BigNumber;
use thiserror::Error;

use crate::security_level::SecurityLevel;

/// Party-1 (initiator)'s final state: its own share, the Paillier keypair
/// it generated, and the shared public key.
#[derive(Clone)]
pub struct KeyShareP1<E: Curve> {
    pub x1: SecretScalar<E>,
    pub paillier_p: BigNumber,
    pub paillier_q: BigNumber,
    pub shared_public_key: Point<E>,
}

/// Party-2 (responder)'s final state: its own share, P1's Paillier public
/// key, an encryption of P1's share usable at signing time, and the shared
/// public key.
#[derive(Clone)]
pub struct KeyShareP2<E: Curve> {
    pub x2: SecretScalar<E>,
    pub paillier_n: BigNumber,
    pub enc_x1: BigNumber,
    pub shared_public_key: Point<E>,
}

impl<E: Curve> KeyShareP1<E> {
    /// Checks the Paillier modulus this share was generated with meets
    /// `L`'s minimum bit length, the same threshold the `(t,n)` keygen's
    /// own aux-info round enforces on `p`/`q`.
    pub fn validate<L: SecurityLevel>(&self) -> Result<(), InvalidTwoPartyShare> {
        if self.paillier_p.bit_length() + self.paillier_q.bit_length() < L::PAILLIER_MIN_BITS {
            return Err(TwoPartyErrorReason::PaillierModulusTooSmall.into());
        }
        Ok(())
    }

    pub fn paillier_n(&self) -> BigNumber {
        &self.paillier_p * &self.paillier_q
    }
}

impl<E: Curve> KeyShareP2<E> {
    pub fn validate<L: SecurityLevel>(&self) -> Result<(), InvalidTwoPartyShare> {
        if self.paillier_n.bit_length() < L::PAILLIER_MIN_BITS {
            return Err(TwoPartyErrorReason::PaillierModulusTooSmall.into());
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvalidTwoPartyShare(#[from] TwoPartyErrorReason);

#[derive(Debug, Error)]
pub(crate) enum TwoPartyErrorReason {
    #[error("paillier modulus is smaller than expected")]
    PaillierModulusTooSmall,
}
