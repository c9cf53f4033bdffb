//! Top-level error type. Every fallible public operation returns
//! `Result<_, Error>` (or a protocol-specific error that converts into it);
//! nothing panics on untrusted input.

use thiserror::Error;

use crate::utils::AbortBlame;

/// Error kinds produced by the core. Any error returned while processing a
/// round transitions that round's session to `Aborted`/`Failed` — the
/// session cannot be resumed afterwards.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("zero-knowledge proof verification failed")]
    ProofVerificationFailed,

    #[error("value fell outside the range the protocol requires")]
    RangeCheckFailed,

    #[error("paillier decryption failed or produced an out-of-range plaintext")]
    PaillierDecryptionFailed,

    #[error("message for a round before the session's current round")]
    OutOfOrderMessage,

    #[error("duplicate message for the current round from the same sender")]
    DuplicateMessage,

    #[error("message from a party outside the session's participant set")]
    UnknownSender,

    #[error("hardened derivation is unsupported: it requires the unshared private key")]
    HardenedDerivationUnsupported,

    #[error("operation mixed points/scalars from different curves")]
    CurveMismatch,

    #[error("session was aborted and cannot be resumed")]
    SessionAborted,

    #[error("fewer than the required threshold of parties took part")]
    ThresholdNotMet,

    #[error("signature failed to verify under the shared public key")]
    SignatureVerificationFailed,

    #[error("protocol aborted by malicious or faulty parties: {blame:?}")]
    ProtocolAborted { blame: Vec<AbortBlame> },

    #[error("internal bug (not caused by a malicious peer): {0}")]
    Internal(String),
}

impl From<key_share::session::SessionError<Error>> for Error {
    fn from(e: key_share::session::SessionError<Error>) -> Self {
        use key_share::session::SessionError::*;
        match e {
            Aborted => Error::SessionAborted,
            PastRound { .. } => Error::OutOfOrderMessage,
            Duplicate { .. } => Error::DuplicateMessage,
            UnknownSender { .. } => Error::UnknownSender,
            RoundOutOfBounds { .. } => Error::OutOfOrderMessage,
            NotCompleted(_) => Error::Internal("result requested before completion".into()),
            Protocol(inner) => inner,
        }
    }
}
