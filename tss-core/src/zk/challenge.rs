//! Fiat-Shamir transcript helper shared by every proof in this module:
//! mixes heterogeneous statement/commitment elements (big integers, curve
//! points, raw bytes) behind fixed-width length prefixes so no ambiguous
//! encoding lets two different transcripts hash to the same challenge, then
//! expands the digest in counter mode to whatever challenge width a given
//! proof needs.

use std::marker::PhantomData;

use digest::Digest;
use generic_ec::{Curve, Point};
use libpaillier::unknown_order::BigNumber;

pub struct Transcript<D> {
    bytes: Vec<u8>,
    _d: PhantomData<D>,
}

impl<D: Digest> Transcript<D> {
    pub fn new(sid: &[u8]) -> Self {
        let mut t = Self {
            bytes: Vec::new(),
            _d: PhantomData,
        };
        t.mix_bytes(sid);
        t
    }

    pub fn mix_bytes(&mut self, b: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(&(b.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(b);
        self
    }

    pub fn mix_bignumber(&mut self, n: &BigNumber) -> &mut Self {
        self.mix_bytes(&n.to_bytes())
    }

    pub fn mix_point<E: Curve>(&mut self, p: &Point<E>) -> &mut Self {
        self.mix_bytes(p.to_bytes(true).as_ref())
    }

    pub fn mix_u16(&mut self, x: u16) -> &mut Self {
        self.mix_bytes(&x.to_be_bytes())
    }

    /// Expands the transcript into a non-negative challenge of exactly
    /// `bits` bits via counter-mode hashing (a single digest call rarely
    /// produces enough output for e.g. a 384-bit challenge).
    pub fn challenge_bignumber(&self, bits: usize) -> BigNumber {
        let need_bytes = (bits + 7) / 8;
        let mut out = Vec::with_capacity(need_bytes + D::output_size());
        let mut counter: u64 = 0;
        while out.len() < need_bytes {
            let mut h = D::new();
            h.update(&self.bytes);
            h.update(counter.to_be_bytes());
            out.extend_from_slice(&h.finalize());
            counter += 1;
        }
        out.truncate(need_bytes);
        BigNumber::from_slice(&out)
    }

    /// Expands the transcript into `count` independent challenge bits,
    /// used by proofs run as many parallel 1-bit-challenge repetitions
    /// (DLN, Paillier-Blum modulus).
    pub fn challenge_bits(&self, count: usize) -> Vec<bool> {
        let need_bytes = (count + 7) / 8;
        let mut out = Vec::with_capacity(need_bytes.max(D::output_size()));
        let mut counter: u64 = 0;
        while out.len() < need_bytes {
            let mut h = D::new();
            h.update(&self.bytes);
            h.update(b"bits");
            h.update(counter.to_be_bytes());
            out.extend_from_slice(&h.finalize());
            counter += 1;
        }
        (0..count)
            .map(|i| (out[i / 8] >> (i % 8)) & 1 == 1)
            .collect()
    }
}

/// Reason a proof failed to verify. Carries a short static tag naming the
/// failing equation/check rather than the full transcript, so logs don't
/// leak proof internals.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("zk proof verification failed: {0}")]
pub struct InvalidProof(pub &'static str);
