//! Curve re-exports. ECDSA protocols are generic over any `generic_ec::Curve`
//! implementation; this module just names the one enabled by default so
//! call sites don't need to depend on `generic-ec` directly to name it.

#[cfg(feature = "curve-secp256k1")]
pub use generic_ec::curves::Secp256k1;
