//! Pedersen commitments and the legacy ECDH amount encoding.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;

use crate::ecc::{g_point, h_point, hash_to_scalar};
use crate::keccak256_multi;

/// `C = mask·G + amount·H`.
pub fn commit(amount: u64, mask: &Scalar) -> EdwardsPoint {
    EdwardsPoint::vartime_multiscalar_mul(
        [*mask, Scalar::from(amount)],
        [g_point(), h_point()],
    )
}

/// Commitment with the mask pinned to one, used for cleartext amounts
/// (coinbase outputs, pre-RingCT balances).
pub fn zero_commit(amount: u64) -> EdwardsPoint {
    commit(amount, &Scalar::ONE)
}

/// Legacy commitment mask: `H_s("commitment_mask" ‖ shared_secret)`.
pub fn gen_commitment_mask(shared_secret: &[u8; 32]) -> Scalar {
    hash_to_scalar(&[b"commitment_mask", shared_secret])
}

/// The 8-byte XOR keystream for compact ECDH amounts:
/// `keccak("amount" ‖ shared_secret)`.
fn amount_factor(shared_secret: &[u8; 32]) -> [u8; 32] {
    keccak256_multi(&[b"amount", shared_secret])
}

/// Encrypt an amount into the compact 8-byte ECDH form.
pub fn ecdh_encode_amount(amount: u64, shared_secret: &[u8; 32]) -> [u8; 8] {
    let factor = amount_factor(shared_secret);
    let clear = amount.to_le_bytes();
    let mut enc = [0u8; 8];
    for i in 0..8 {
        enc[i] = clear[i] ^ factor[i];
    }
    enc
}

/// Inverse of `ecdh_encode_amount` (the XOR keystream is self-inverse).
pub fn ecdh_decode_amount(encrypted: &[u8; 8], shared_secret: &[u8; 32]) -> u64 {
    let factor = amount_factor(shared_secret);
    let mut clear = [0u8; 8];
    for i in 0..8 {
        clear[i] = encrypted[i] ^ factor[i];
    }
    u64::from_le_bytes(clear)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::random_scalar;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn commitment_homomorphism() {
        let mut rng = StdRng::seed_from_u64(21);
        let (a1, a2) = (1_000_000u64, 250_000u64);
        let m1 = random_scalar(&mut rng);
        let m2 = random_scalar(&mut rng);
        assert_eq!(
            commit(a1, &m1) + commit(a2, &m2),
            commit(a1 + a2, &(m1 + m2)),
        );
    }

    #[test]
    fn zero_commit_matches_unit_mask() {
        assert_eq!(zero_commit(42), commit(42, &Scalar::ONE));
    }

    #[test]
    fn ecdh_amount_round_trip() {
        let ss = [0x5a; 32];
        for amount in [0u64, 1, 255, 1 << 40, u64::MAX] {
            let enc = ecdh_encode_amount(amount, &ss);
            assert_eq!(ecdh_decode_amount(&enc, &ss), amount);
        }
    }

    #[test]
    fn ecdh_amount_keyed_by_secret() {
        let enc = ecdh_encode_amount(777, &[0x01; 32]);
        assert_ne!(ecdh_decode_amount(&enc, &[0x02; 32]), 777);
    }

    #[test]
    fn commitment_mask_deterministic() {
        let ss = [0x33; 32];
        assert_eq!(gen_commitment_mask(&ss), gen_commitment_mask(&ss));
        assert_ne!(gen_commitment_mask(&ss), Scalar::ZERO);
    }
}
