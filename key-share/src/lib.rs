//! Key share types for every protocol in the workspace: the threshold-ECDSA
//! core/completed shares, the two-party-ECDSA shares, and the EdDSA shares.
//!
//! This crate only defines data and the invariants data must satisfy
//! ([`validate`](IncompleteKeyShare::validate), [`Valid`]); the protocols
//! that produce and consume these types live in `threshold-keygen` and
//! `tss-core`.

pub mod eddsa;
pub mod hd;
pub mod security_level;
pub mod session;
pub mod twoparty;
pub mod vss;

use generic_ec::{Curve, Point, SecretScalar};
pub use libpaillier::unknown_order::BigNumber;
use security_level::SecurityLevel;
use thiserror::Error;

/// Core key share: the output of a distributed key generation round, before
/// the auxiliary Paillier/Pedersen data needed for signing has been
/// attached.
///
/// Cannot be used for signing directly — see [`KeyShare`].
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct IncompleteKeyShare<E: Curve, L: SecurityLevel> {
    /// Index of the local party among the `n` shareholders.
    pub i: u16,
    /// Shared public key `Y = sk * G`.
    pub shared_public_key: Point<E>,
    /// Randomness contributed collectively by all parties at keygen time,
    /// mixed into every subsequent Fiat-Shamir challenge derived from this
    /// key (binds proofs to this specific key generation run).
    pub rid: L::Rid,
    /// Public verification share of every party, `public_shares[i] = x_i * G`.
    pub public_shares: Vec<Point<E>>,
    /// Local secret share `x_i`.
    pub x: SecretScalar<E>,
}

/// Completed key share: a [`IncompleteKeyShare`] plus the auxiliary data
/// (Paillier keypair, Ring-Pedersen parameters, El-Gamal key) required to
/// take part in threshold signing.
#[derive(Clone)]
pub struct KeyShare<E: Curve, L: SecurityLevel> {
    pub core: IncompleteKeyShare<E, L>,
    /// Local secret Paillier prime `p`.
    pub p: BigNumber,
    /// Local secret Paillier prime `q`.
    pub q: BigNumber,
    /// Local secret El-Gamal key `y_i`, used in the Π_log* proofs during
    /// signing.
    pub y: SecretScalar<E>,
    /// Auxiliary public data of every party, indexed like `public_shares`.
    pub parties: Vec<PartyAux<E>>,
    /// BIP32 chain code, present once the share has been derived (or was
    /// generated with chain-code support enabled).
    pub chain_code: Option<hd::ChainCode>,
}

/// Public auxiliary data published by one party at key-refresh time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartyAux<E: Curve> {
    /// Paillier modulus `N_i = p_i * q_i`.
    pub N: BigNumber,
    /// Ring-Pedersen parameter `s_i`.
    pub s: BigNumber,
    /// Ring-Pedersen parameter `t_i`.
    pub t: BigNumber,
    /// El-Gamal public key `Y_i = y_i * G`.
    pub Y: Point<E>,
}

/// A value that has passed [`IncompleteKeyShare::validate`] /
/// [`KeyShare::validate`] exactly once. Downstream signing code accepts
/// `&Valid<KeyShare<..>>` so the invariant check is never silently skipped
/// and never silently repeated per signing round.
#[derive(Clone)]
pub struct Valid<T>(T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Valid<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<E: Curve, L: SecurityLevel> TryFrom<IncompleteKeyShare<E, L>> for Valid<IncompleteKeyShare<E, L>> {
    type Error = InvalidKeyShare;
    fn try_from(share: IncompleteKeyShare<E, L>) -> Result<Self, Self::Error> {
        share.validate()?;
        Ok(Valid(share))
    }
}

impl<E: Curve, L: SecurityLevel> TryFrom<KeyShare<E, L>> for Valid<KeyShare<E, L>> {
    type Error = InvalidKeyShare;
    fn try_from(share: KeyShare<E, L>) -> Result<Self, Self::Error> {
        share.validate()?;
        Ok(Valid(share))
    }
}

impl<E: Curve, L: SecurityLevel> IncompleteKeyShare<E, L> {
    /// Checks the invariants listed in the data model: party index in
    /// range, local share consistent with its published public share, and
    /// `Y = sum(public_shares)`.
    pub fn validate(&self) -> Result<(), InvalidKeyShare> {
        let n: u16 = self
            .public_shares
            .len()
            .try_into()
            .or(Err(ErrorReason::PartiesNumberOverflowU16))?;
        if self.i >= n {
            return Err(ErrorReason::PartyIndexOutOfBounds.into());
        }

        let party_public_share = self.public_shares[usize::from(self.i)];
        if party_public_share != Point::generator() * &self.x {
            return Err(ErrorReason::PartySecretShareDoesntMatchPublicShare.into());
        }

        let reconstructed_pk = self.public_shares.iter().copied().sum::<Point<E>>();
        if reconstructed_pk != self.shared_public_key {
            return Err(ErrorReason::SharesDontMatchPublicKey.into());
        }

        Ok(())
    }
}

impl<E: Curve, L: SecurityLevel> KeyShare<E, L> {
    pub fn validate(&self) -> Result<(), InvalidKeyShare> {
        self.core.validate()?;

        if self.core.public_shares.len() != self.parties.len() {
            return Err(ErrorReason::AuxWrongLength.into());
        }
        if self.p.bit_length() + self.q.bit_length() < L::PAILLIER_MIN_BITS {
            return Err(ErrorReason::PaillierModulusTooSmall.into());
        }
        let N = &self.p * &self.q;
        let my_aux = &self.parties[usize::from(self.core.i)];
        if my_aux.N != N {
            return Err(ErrorReason::PaillierKeyMismatch.into());
        }
        if my_aux.Y != Point::generator() * &self.y {
            return Err(ErrorReason::ElGamalKeyMismatch.into());
        }
        if self
            .parties
            .iter()
            .any(|p| p.s.gcd(&p.N) != BigNumber::one() || p.t.gcd(&p.N) != BigNumber::one())
        {
            return Err(ErrorReason::PedersenStOrTNotCoprimeWithN.into());
        }
        Ok(())
    }
}

/// Error indicating key share is not valid.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvalidKeyShare(#[from] ErrorReason);

#[derive(Debug, Error)]
pub(crate) enum ErrorReason {
    #[error("number of parties overflows u16")]
    PartiesNumberOverflowU16,
    #[error("party index out of bounds")]
    PartyIndexOutOfBounds,
    #[error("party secret share doesn't match its public share")]
    PartySecretShareDoesntMatchPublicShare,
    #[error("sum of public shares doesn't match shared public key")]
    SharesDontMatchPublicKey,
    #[error("auxiliary data length doesn't match number of parties")]
    AuxWrongLength,
    #[error("paillier modulus is smaller than the security level requires")]
    PaillierModulusTooSmall,
    #[error("local paillier key doesn't match published auxiliary data")]
    PaillierKeyMismatch,
    #[error("local el-gamal key doesn't match published auxiliary data")]
    ElGamalKeyMismatch,
    #[error("gcd(s_j, N_j) != 1 or gcd(t_j, N_j) != 1")]
    PedersenStOrTNotCoprimeWithN,
}
