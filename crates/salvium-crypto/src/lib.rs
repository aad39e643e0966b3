//! Cryptographic primitives for the Salvium transaction engine.
//!
//! Layering, leaves first: hashing and group arithmetic (`ecc`,
//! `elligator2`), Pedersen commitments and the legacy CryptoNote key
//! derivation (`commitment`, `cn_keys`), the CARROT enote pipeline
//! (`carrot`), and the proof systems (`clsag`, `tclsag`,
//! `bulletproofs_plus`, `pr_proof`).
//!
//! Everything is pure CPU. Randomness is always taken from an injected
//! `RngCore + CryptoRng`; nothing here seeds its own generator or touches
//! I/O.

pub mod ecc;
pub mod elligator2;
pub mod commitment;
pub mod cn_keys;
pub mod carrot;
pub mod clsag;
pub mod tclsag;
pub mod bulletproofs_plus;
pub mod pr_proof;

mod error;

pub use error::CryptoError;

use tiny_keccak::{Hasher, Keccak};

/// Keccak-256 (the CryptoNote `cn_fast_hash` variant, not SHA3).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut out);
    out
}

/// Keccak-256 over the concatenation of several slices.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    for p in parts {
        keccak.update(p);
    }
    keccak.finalize(&mut out);
    out
}

/// Unkeyed Blake2b with variable output length.
pub fn blake2b(data: &[u8], out_len: usize) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Keyed Blake2b (RFC 7693), used by every CARROT domain hash.
pub fn blake2b_keyed(data: &[u8], out_len: usize, key: &[u8]) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .key(key)
        .hash(data)
        .as_bytes()
        .to_vec()
}
