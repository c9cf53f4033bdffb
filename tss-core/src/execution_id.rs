//! Execution/session id: a byte string every party is expected to agree on
//! out of band (e.g. a UUID assigned by the external coordinator) that is
//! mixed into every commitment and Fiat-Shamir challenge a session
//! produces, so transcripts from two distinct sessions — even for the same
//! parties and the same protocol — can never be confused or replayed
//! against each other.

use std::marker::PhantomData;

use digest::Digest;
use generic_ec::Curve;
use key_share::security_level::SecurityLevel;

/// Which protocol a session's execution id was evaluated for; mixed in so
/// a transcript from e.g. a key-refresh run can't be replayed as if it were
/// a signing run's transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolChoice {
    Keygen,
    KeyRefresh,
    Signing,
    Reshare,
}

impl ProtocolChoice {
    fn tag(self) -> &'static [u8] {
        match self {
            ProtocolChoice::Keygen => b"keygen",
            ProtocolChoice::KeyRefresh => b"key-refresh",
            ProtocolChoice::Signing => b"signing",
            ProtocolChoice::Reshare => b"reshare",
        }
    }
}

/// Opaque execution id builder. Defaults to an empty id (fine for tests
/// with a single session in flight); production callers should set a
/// fresh id per session via [`ExecutionId::new`].
#[derive(Clone)]
pub struct ExecutionId<E, L, D> {
    bytes: Vec<u8>,
    _ph: PhantomData<(E, L, D)>,
}

impl<E: Curve, L: SecurityLevel, D: Digest> Default for ExecutionId<E, L, D> {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            _ph: PhantomData,
        }
    }
}

impl<E: Curve, L: SecurityLevel, D: Digest> ExecutionId<E, L, D> {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            _ph: PhantomData,
        }
    }

    /// Finalizes the execution id against a specific protocol, producing
    /// the session id (`sid`) mixed into that protocol's transcript.
    pub fn evaluate(self, protocol: ProtocolChoice) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + protocol.tag().len() + 1);
        out.extend_from_slice(protocol.tag());
        out.push(0);
        out.extend_from_slice(&self.bytes);
        out
    }
}
