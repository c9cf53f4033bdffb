//! Shamir secret sharing, Feldman verifiable-share commitments, and
//! Lagrange-coefficient reconstruction, over any scalar field the caller
//! provides via [`ScalarField`].
//!
//! A trait (rather than hardcoding `generic_ec::Scalar<E>`) lets the same
//! polynomial/Lagrange math serve both the ECDSA DKG (`generic_ec::Scalar<E>`)
//! and the EdDSA DKG (`curve25519_dalek::Scalar`), which do not share a
//! common curve-arithmetic crate in this workspace.

use core::ops::{Add, Mul, Neg, Sub};

/// Minimal field interface needed for Shamir polynomial evaluation and
/// Lagrange interpolation: a commutative ring with subtraction and
/// multiplicative inverse.
pub trait ScalarField:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + PartialEq
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_u16(x: u16) -> Self;
    /// Multiplicative inverse; `None` only for zero.
    fn invert(&self) -> Option<Self>;
}

/// A degree-`t - 1` polynomial over `F`, `f(x) = sum(coeffs[k] * x^k)`.
/// `coeffs[0]` is the shared secret.
#[derive(Clone)]
pub struct Polynomial<F: ScalarField> {
    pub coeffs: Vec<F>,
}

impl<F: ScalarField> Polynomial<F> {
    pub fn sample<R: rand_core::RngCore>(degree: usize, constant_term: F, mut sample_coeff: impl FnMut(&mut R) -> F, rng: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(degree + 1);
        coeffs.push(constant_term);
        for _ in 0..degree {
            coeffs.push(sample_coeff(rng));
        }
        Self { coeffs }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Evaluates `f(x)` at a party index (indices are 1-based in every
    /// protocol in this workspace: index 0 is reserved for the secret
    /// itself, matching the conventional BIP32/Shamir-over-parties
    /// convention and avoiding a party ever being handed a share equal to
    /// the secret's own evaluation point).
    pub fn evaluate(&self, x: F) -> F {
        // Horner's method, highest degree first.
        let mut acc = F::zero();
        for c in self.coeffs.iter().rev() {
            acc = acc * x + *c;
        }
        acc
    }
}

/// Lagrange coefficient `lambda_i(S)` for reconstructing `f(0)` from
/// shares `{f(j)}_{j in S}`, evaluated at index `i` within subset `S`.
pub fn lagrange_coefficient<F: ScalarField>(indices: &[F], i: F) -> Option<F> {
    let mut num = F::one();
    let mut den = F::one();
    for &j in indices {
        if j == i {
            continue;
        }
        num = num * (F::zero() - j);
        den = den * (i - j);
    }
    let den_inv = den.invert()?;
    Some(num * den_inv)
}

/// Reconstructs `f(0)` from a set of `(index, share)` pairs via Lagrange
/// interpolation. Any `t` correct shares from an honest `(t, n)` sharing
/// reconstruct the same secret, regardless of which `t`-subset is chosen.
pub fn reconstruct<F: ScalarField>(shares: &[(F, F)]) -> Option<F> {
    let indices: Vec<F> = shares.iter().map(|(i, _)| *i).collect();
    let mut acc = F::zero();
    for &(i, y) in shares {
        let lambda = lagrange_coefficient(&indices, i)?;
        acc = acc + lambda * y;
    }
    Some(acc)
}

impl<E: generic_ec::Curve> ScalarField for generic_ec::Scalar<E> {
    fn zero() -> Self {
        generic_ec::Scalar::zero()
    }
    fn one() -> Self {
        generic_ec::Scalar::from(1)
    }
    fn from_u16(x: u16) -> Self {
        generic_ec::Scalar::from(u64::from(x))
    }
    fn invert(&self) -> Option<Self> {
        Option::from(generic_ec::Scalar::invert(self))
    }
}

impl ScalarField for curve25519_dalek::scalar::Scalar {
    fn zero() -> Self {
        curve25519_dalek::scalar::Scalar::ZERO
    }
    fn one() -> Self {
        curve25519_dalek::scalar::Scalar::ONE
    }
    fn from_u16(x: u16) -> Self {
        curve25519_dalek::scalar::Scalar::from(x)
    }
    fn invert(&self) -> Option<Self> {
        if *self == curve25519_dalek::scalar::Scalar::ZERO {
            None
        } else {
            Some(curve25519_dalek::scalar::Scalar::invert(self))
        }
    }
}
