//! The return-address balance proof: a Schnorr proof of knowledge of
//! Δ = Σ pseudo_masks − Σ output_masks, the discrete log of the
//! transaction's `p_r` element.
//!
//! Builders that balance pseudo-outs exactly have Δ = 0 and publish the
//! identity; the proof form is the same either way.

use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};

use crate::ecc::{compress, decompress, hash_to_scalar, random_scalar, scalar_mult_base};

/// `{R, z1, z2}` as serialized in salvium_data. `z2` is reserved and
/// always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrProof {
    pub r: [u8; 32],
    pub z1: Scalar,
    pub z2: Scalar,
}

/// `p_r = Δ·G` as broadcast in the rct-base.
pub fn p_r_point(delta: &Scalar) -> [u8; 32] {
    compress(&scalar_mult_base(delta))
}

/// Prove knowledge of Δ: pick `r`, publish `R = r·G`, `z1 = r + c·Δ`
/// with `c = H_s(R ‖ p_r)`.
pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, delta: &Scalar) -> PrProof {
    let nonce = random_scalar(rng);
    let r = compress(&scalar_mult_base(&nonce));
    let p_r = p_r_point(delta);
    let c = hash_to_scalar(&[&r, &p_r]);
    PrProof {
        r,
        z1: nonce + c * delta,
        z2: Scalar::ZERO,
    }
}

/// Check `z1·G == R + c·p_r` and that the reserved `z2` is zero.
pub fn verify(proof: &PrProof, p_r: &[u8; 32]) -> bool {
    if proof.z2 != Scalar::ZERO {
        return false;
    }
    let r_point = match decompress(&proof.r) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let p_r_pt = match decompress(p_r) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let c = hash_to_scalar(&[&proof.r, p_r]);
    scalar_mult_base(&proof.z1) == r_point + c * p_r_pt
}
