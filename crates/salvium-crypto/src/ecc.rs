//! Scalar and group arithmetic over the prime-order subgroup of
//! edwards25519, plus the domain-separated hash-to-scalar and
//! hash-to-point used throughout RingCT.
//!
//! Scalars are always canonical (< ℓ). Point decoding rejects
//! non-canonical encodings by re-compressing and comparing bytes.

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand::{CryptoRng, RngCore};
use std::sync::OnceLock;

use crate::{keccak256_multi, CryptoError};

/// The second generator `H` used for amount commitments, derived once as
/// `hash_to_point(G)` and fixed on the wire ever since.
pub const H_BYTES: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf,
    0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0, 0xea,
    0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9,
    0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c, 0x1f, 0x94,
];

/// The third generator `T`, used by TCLSAG and the CARROT one-time
/// address extension over T.
pub const T_BYTES: [u8; 32] = [
    0x96, 0x6f, 0xc6, 0x6b, 0x82, 0xcd, 0x56, 0xcf,
    0x85, 0xea, 0xec, 0x80, 0x1c, 0x42, 0x84, 0x5f,
    0x5f, 0x40, 0x88, 0x78, 0xd1, 0x56, 0x1e, 0x00,
    0xd3, 0xd7, 0xde, 0xd2, 0x79, 0x4d, 0x09, 0x4f,
];

/// Compressed encoding of the group identity.
pub const IDENTITY_BYTES: [u8; 32] = {
    let mut b = [0u8; 32];
    b[0] = 0x01;
    b
};

/// The subgroup base point `G`.
pub fn g_point() -> EdwardsPoint {
    ED25519_BASEPOINT_POINT
}

/// The amount-commitment generator `H`.
pub fn h_point() -> EdwardsPoint {
    static H: OnceLock<EdwardsPoint> = OnceLock::new();
    *H.get_or_init(|| {
        CompressedEdwardsY(H_BYTES)
            .decompress()
            .expect("H generator bytes are a valid point")
    })
}

/// The twin generator `T`.
pub fn t_point() -> EdwardsPoint {
    static T: OnceLock<EdwardsPoint> = OnceLock::new();
    *T.get_or_init(|| {
        CompressedEdwardsY(T_BYTES)
            .decompress()
            .expect("T generator bytes are a valid point")
    })
}

// ─── Encoding ───────────────────────────────────────────────────────────────

/// Decode a compressed point, rejecting non-canonical encodings.
pub fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    let point = CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint)?;
    if point.compress().to_bytes() != *bytes {
        return Err(CryptoError::InvalidPoint);
    }
    Ok(point)
}

pub fn compress(point: &EdwardsPoint) -> [u8; 32] {
    point.compress().to_bytes()
}

/// Decode a scalar, requiring the canonical (< ℓ) encoding.
pub fn canonical_scalar(bytes: &[u8; 32]) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
        .ok_or(CryptoError::InvalidScalar)
}

/// `sc_check`: whether 32 bytes are a canonical scalar.
pub fn sc_check(bytes: &[u8; 32]) -> bool {
    canonical_scalar(bytes).is_ok()
}

// ─── Scalar arithmetic ──────────────────────────────────────────────────────

pub fn sc_reduce32(bytes: &[u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(*bytes)
}

pub fn sc_reduce64(bytes: &[u8; 64]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(bytes)
}

/// Inversion fails on zero rather than returning garbage.
pub fn sc_invert(s: &Scalar) -> Result<Scalar, CryptoError> {
    if *s == Scalar::ZERO {
        return Err(CryptoError::ZeroInverse);
    }
    Ok(s.invert())
}

/// 8⁻¹ mod ℓ, used to store commitment images as ⅛·D.
pub fn inv_eight() -> Scalar {
    static INV8: OnceLock<Scalar> = OnceLock::new();
    *INV8.get_or_init(|| Scalar::from(8u64).invert())
}

/// Uniform scalar from the injected CSPRNG (64 bytes, wide-reduced).
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

// ─── Group arithmetic ───────────────────────────────────────────────────────

pub fn scalar_mult_base(s: &Scalar) -> EdwardsPoint {
    ED25519_BASEPOINT_TABLE * s
}

/// Variable-time `a·P + b·G`.
pub fn double_scalar_mult_base(a: &Scalar, p: &EdwardsPoint, b: &Scalar) -> EdwardsPoint {
    EdwardsPoint::vartime_multiscalar_mul([*a, *b], [*p, ED25519_BASEPOINT_POINT])
}

/// Cofactor clearing: `8·P`.
pub fn mul8(p: &EdwardsPoint) -> EdwardsPoint {
    p.mul_by_cofactor()
}

// ─── Hashing into the group ─────────────────────────────────────────────────

/// `H_s`: keccak over the concatenated parts, reduced mod ℓ.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256_multi(parts))
}

/// `H_p`: keccak, elligator2 map, then cofactor clearing.
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    let digest = crate::keccak256(data);
    crate::elligator2::ge_fromfe_frombytes_vartime(&digest).mul_by_cofactor()
}

/// Key image `I = x·H_p(P)` for the one-time key pair `(x, P)`.
pub fn generate_key_image(public_key: &[u8; 32], secret: &Scalar) -> [u8; 32] {
    (secret * hash_to_point(public_key)).compress().to_bytes()
}
