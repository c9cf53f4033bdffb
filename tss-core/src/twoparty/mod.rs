//! Two-party (Lindell-style) ECDSA: a dedicated keygen and signing
//! protocol for exactly two parties, distinguished from the general (t, n)
//! threshold flow because the two parties end up holding structurally
//! different state (P1 the Paillier private key, P2 an encryption of P1's
//! share) rather than symmetric shares.

pub mod keygen;
pub mod sign;

/// Which of the two fixed roles a local party is playing. Two-party
/// protocols are asymmetric enough (only P1 ever generates a Paillier
/// keypair) that this is clearer than reusing the threshold code's party
/// index for everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    P1,
    P2,
}

impl Role {
    pub fn index(self) -> u16 {
        match self {
            Role::P1 => 0,
            Role::P2 => 1,
        }
    }
}
