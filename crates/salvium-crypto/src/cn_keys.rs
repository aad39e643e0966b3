//! Legacy CryptoNote key derivation: the `D = 8·a·R` ECDH derivation,
//! per-output one-time keys, the 1-byte view tag, and subaddress keys.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::ecc::{decompress, hash_to_scalar, scalar_mult_base};
use crate::CryptoError;

fn varint(mut v: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Cofactor-cleared ECDH: `D = 8·a·R` where `a` is the view secret and
/// `R` the transaction public key. Also the sender side with roles
/// swapped (`8·r·A`).
pub fn generate_key_derivation(
    tx_pubkey: &[u8; 32],
    secret: &Scalar,
) -> Result<[u8; 32], CryptoError> {
    let point = decompress(tx_pubkey)?;
    Ok((secret * point).mul_by_cofactor().compress().to_bytes())
}

/// `H_s(D ‖ varint(i))`.
pub fn derivation_to_scalar(derivation: &[u8; 32], output_index: u64) -> Scalar {
    let mut buf = Vec::with_capacity(32 + 10);
    buf.extend_from_slice(derivation);
    varint(output_index, &mut buf);
    hash_to_scalar(&[&buf])
}

/// One-time output key `K_o = H_s(D, i)·G + B`.
pub fn derive_public_key(
    derivation: &[u8; 32],
    output_index: u64,
    spend_pubkey: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let base = decompress(spend_pubkey)?;
    let ext = derivation_to_scalar(derivation, output_index);
    Ok((scalar_mult_base(&ext) + base).compress().to_bytes())
}

/// One-time spend key `x = H_s(D, i) + b`.
pub fn derive_secret_key(
    derivation: &[u8; 32],
    output_index: u64,
    spend_secret: &Scalar,
) -> Scalar {
    derivation_to_scalar(derivation, output_index) + spend_secret
}

/// Receiver-side inverse of `derive_public_key`: `B = K_o − H_s(D, i)·G`,
/// used to match outputs against the subaddress table.
pub fn derive_subaddress_public_key(
    output_key: &EdwardsPoint,
    derivation: &[u8; 32],
    output_index: u64,
) -> [u8; 32] {
    let ext = derivation_to_scalar(derivation, output_index);
    (output_key - scalar_mult_base(&ext)).compress().to_bytes()
}

/// 1-byte view tag: `keccak("view_tag" ‖ D ‖ varint(i))[0]`.
pub fn derive_view_tag(derivation: &[u8; 32], output_index: u64) -> u8 {
    let mut buf = Vec::with_capacity(8 + 32 + 10);
    buf.extend_from_slice(b"view_tag");
    buf.extend_from_slice(derivation);
    varint(output_index, &mut buf);
    crate::keccak256(&buf)[0]
}

/// Subaddress secret `m = H_s("SubAddr\0" ‖ k_v ‖ major ‖ minor)`.
pub fn subaddress_secret_key(view_secret: &Scalar, major: u32, minor: u32) -> Scalar {
    let mut buf = Vec::with_capacity(8 + 32 + 8);
    buf.extend_from_slice(b"SubAddr\0");
    buf.extend_from_slice(&view_secret.to_bytes());
    buf.extend_from_slice(&major.to_le_bytes());
    buf.extend_from_slice(&minor.to_le_bytes());
    hash_to_scalar(&[&buf])
}

/// Subaddress spend pubkey `D_i = B + m·G`.
pub fn subaddress_spend_pubkey(
    spend_pubkey: &[u8; 32],
    view_secret: &Scalar,
    major: u32,
    minor: u32,
) -> Result<[u8; 32], CryptoError> {
    if major == 0 && minor == 0 {
        return Ok(*spend_pubkey);
    }
    let base = decompress(spend_pubkey)?;
    let m = subaddress_secret_key(view_secret, major, minor);
    Ok((base + scalar_mult_base(&m)).compress().to_bytes())
}
