//! Key share types for threshold EdDSA (ed25519). Unlike the ECDSA side,
//! there is no Paillier/Ring-Pedersen auxiliary data: EdDSA threshold
//! signing is purely additive-Schnorr, so the core DKG output *is* the
//! usable key share.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use thiserror::Error;

use crate::hd::ChainCode;

/// EdDSA threshold key share.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct KeyShareEddsa {
    /// Index of the local party among the `n` shareholders.
    pub i: u16,
    /// Shared public key `Y = sk * B`.
    #[serde(with = "point_serde")]
    pub shared_public_key: EdwardsPoint,
    /// Public verification share of every party.
    #[serde(with = "points_serde")]
    pub public_shares: Vec<EdwardsPoint>,
    /// Local secret share `x_i`.
    #[serde(with = "scalar_serde")]
    pub x: Scalar,
    /// BIP32 chain code, if this share was (or can be) hierarchically
    /// derived.
    pub chain_code: Option<ChainCode>,
}

impl KeyShareEddsa {
    pub fn validate(&self) -> Result<(), InvalidEddsaKeyShare> {
        let n: u16 = self
            .public_shares
            .len()
            .try_into()
            .or(Err(EddsaErrorReason::PartiesNumberOverflowU16))?;
        if self.i >= n {
            return Err(EddsaErrorReason::PartyIndexOutOfBounds.into());
        }
        let expected = &self.x * curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
        if expected != self.public_shares[usize::from(self.i)] {
            return Err(EddsaErrorReason::PartySecretShareDoesntMatchPublicShare.into());
        }
        let reconstructed: EdwardsPoint = self.public_shares.iter().sum();
        if reconstructed != self.shared_public_key {
            return Err(EddsaErrorReason::SharesDontMatchPublicKey.into());
        }
        Ok(())
    }
}

/// Validates a raw ed25519 secret-key/seed byte string before it's used to
/// seed a trusted-dealer split or otherwise imported into this workspace:
/// must be exactly 32 bytes and not the all-zero seed (which RFC 8032
/// clamping would turn into a degenerate, publicly-known scalar).
pub fn validate_raw_secret(bytes: &[u8]) -> Result<(), InvalidRawSecret> {
    if bytes.len() != 32 {
        return Err(RawSecretErrorReason::WrongLength { len: bytes.len() }.into());
    }
    if bytes.iter().all(|&b| b == 0) {
        return Err(RawSecretErrorReason::AllZero.into());
    }
    Ok(())
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvalidEddsaKeyShare(#[from] EddsaErrorReason);

#[derive(Debug, Error)]
pub(crate) enum EddsaErrorReason {
    #[error("number of parties overflows u16")]
    PartiesNumberOverflowU16,
    #[error("party index out of bounds")]
    PartyIndexOutOfBounds,
    #[error("party secret share doesn't match its public share")]
    PartySecretShareDoesntMatchPublicShare,
    #[error("sum of public shares doesn't match shared public key")]
    SharesDontMatchPublicKey,
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvalidRawSecret(#[from] RawSecretErrorReason);

#[derive(Debug, Error)]
pub(crate) enum RawSecretErrorReason {
    #[error("ed25519 secret must be exactly 32 bytes, got {len}")]
    WrongLength { len: usize },
    #[error("ed25519 secret is the all-zero seed")]
    AllZero,
}

pub mod scalar_serde {
    use curve25519_dalek::scalar::Scalar;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(s: &Scalar, ser: S) -> Result<S::Ok, S::Error> {
        s.to_bytes().serialize(ser)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Scalar, D::Error> {
        let bytes = <[u8; 32]>::deserialize(de)?;
        Option::from(Scalar::from_canonical_bytes(bytes))
            .ok_or_else(|| serde::de::Error::custom("non-canonical scalar encoding"))
    }
}

pub mod point_serde {
    use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(p: &EdwardsPoint, ser: S) -> Result<S::Ok, S::Error> {
        p.compress().to_bytes().serialize(ser)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<EdwardsPoint, D::Error> {
        let bytes = <[u8; 32]>::deserialize(de)?;
        CompressedEdwardsY(bytes)
            .decompress()
            .ok_or_else(|| serde::de::Error::custom("invalid compressed edwards point"))
    }
}

pub mod points_serde {
    use curve25519_dalek::edwards::EdwardsPoint;
    use serde::{Deserializer, Serializer};
    use serde_with::{DeserializeAs, SerializeAs};

    struct AsPoint;
    impl SerializeAs<EdwardsPoint> for AsPoint {
        fn serialize_as<S: Serializer>(p: &EdwardsPoint, ser: S) -> Result<S::Ok, S::Error> {
            super::point_serde::serialize(p, ser)
        }
    }
    impl<'de> DeserializeAs<'de, EdwardsPoint> for AsPoint {
        fn deserialize_as<D: Deserializer<'de>>(de: D) -> Result<EdwardsPoint, D::Error> {
            super::point_serde::deserialize(de)
        }
    }

    pub fn serialize<S: Serializer>(ps: &[EdwardsPoint], ser: S) -> Result<S::Ok, S::Error> {
        serde_with::As::<Vec<AsPoint>>::serialize(ps, ser)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<EdwardsPoint>, D::Error> {
        serde_with::As::<Vec<AsPoint>>::deserialize(de)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_raw_secret(&[1u8; 31]).is_err());
        assert!(validate_raw_secret(&[1u8; 33]).is_err());
        assert!(validate_raw_secret(&[]).is_err());
    }

    #[test]
    fn rejects_all_zero_seed() {
        assert!(validate_raw_secret(&[0u8; 32]).is_err());
    }

    #[test]
    fn accepts_well_formed_seed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        assert!(validate_raw_secret(&bytes).is_ok());
    }
}
