//! CLSAG ring signatures (Compact Linkable Spontaneous Anonymous Group).
//!
//! One secret row carries the spend key `p` of `ring[ℓ]` plus the mask
//! difference `z = mask − pseudo_mask`; the signature proves knowledge of
//! both and links spends through the key image `I = p·H_p(P_ℓ)`. The
//! commitment image is stored ⅛-scaled and re-multiplied by 8 on verify.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand::{CryptoRng, RngCore};

use crate::ecc::{
    compress, decompress, hash_to_point, hash_to_scalar, inv_eight, mul8, random_scalar,
};
use crate::CryptoError;

// Domain separators, zero-padded to 32 bytes like the C++ config strings.
pub(crate) fn pad_domain(s: &[u8]) -> [u8; 32] {
    let mut buf = [0u8; 32];
    buf[..s.len()].copy_from_slice(s);
    buf
}

pub(crate) const AGG_0: &[u8] = b"CLSAG_agg_0";
pub(crate) const AGG_1: &[u8] = b"CLSAG_agg_1";
pub(crate) const ROUND: &[u8] = b"CLSAG_round";

#[derive(Debug, Clone)]
pub struct ClsagSignature {
    pub s: Vec<Scalar>,
    pub c1: Scalar,
    /// `I = p·H_p(P_ℓ)`.
    pub key_image: [u8; 32],
    /// `⅛·z·H_p(P_ℓ)`.
    pub commitment_image: [u8; 32],
}

/// Ring data shared between the signer and verifier loops.
pub(crate) struct RingContext {
    pub points: Vec<EdwardsPoint>,
    pub hashed: Vec<EdwardsPoint>,
    pub c_diff: Vec<EdwardsPoint>,
}

impl RingContext {
    pub fn new(
        ring: &[[u8; 32]],
        commitments: &[[u8; 32]],
        pseudo_out: &[u8; 32],
    ) -> Result<Self, CryptoError> {
        if ring.is_empty() || ring.len() != commitments.len() {
            return Err(CryptoError::RingShape(format!(
                "ring {} vs commitments {}",
                ring.len(),
                commitments.len()
            )));
        }
        let pseudo = decompress(pseudo_out)?;
        let mut points = Vec::with_capacity(ring.len());
        let mut hashed = Vec::with_capacity(ring.len());
        let mut c_diff = Vec::with_capacity(ring.len());
        for (pk, c) in ring.iter().zip(commitments) {
            points.push(decompress(pk)?);
            hashed.push(hash_to_point(pk));
            c_diff.push(decompress(c)? - pseudo);
        }
        Ok(Self { points, hashed, c_diff })
    }
}

/// Aggregation coefficients `μ_P`, `μ_C`.
pub(crate) fn aggregation_coefficients(
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    key_image: &[u8; 32],
    commitment_image: &[u8; 32],
    pseudo_out: &[u8; 32],
) -> (Scalar, Scalar) {
    let agg0 = pad_domain(AGG_0);
    let agg1 = pad_domain(AGG_1);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(2 * ring.len() + 4);
    parts.push(&agg0);
    for pk in ring {
        parts.push(pk);
    }
    for c in commitments {
        parts.push(c);
    }
    parts.push(key_image);
    parts.push(commitment_image);
    parts.push(pseudo_out);
    let mu_p = hash_to_scalar(&parts);
    parts[0] = &agg1;
    let mu_c = hash_to_scalar(&parts);
    (mu_p, mu_c)
}

/// Round challenge `c = H_s("CLSAG_round" ‖ P ‖ C ‖ C' ‖ m ‖ L ‖ R)`.
pub(crate) fn round_challenge(
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
    message: &[u8; 32],
    l: &[u8; 32],
    r: &[u8; 32],
) -> Scalar {
    let round = pad_domain(ROUND);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(2 * ring.len() + 5);
    parts.push(&round);
    for pk in ring {
        parts.push(pk);
    }
    for c in commitments {
        parts.push(c);
    }
    parts.push(pseudo_out);
    parts.push(message);
    parts.push(l);
    parts.push(r);
    hash_to_scalar(&parts)
}

/// Sign `message` over the ring, closing the commitment difference with
/// `mask_delta = mask − pseudo_mask` for the real row.
#[allow(clippy::too_many_arguments)]
pub fn sign<R: RngCore + CryptoRng>(
    rng: &mut R,
    message: &[u8; 32],
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
    secret_key: &Scalar,
    mask_delta: &Scalar,
    secret_index: usize,
) -> Result<ClsagSignature, CryptoError> {
    let n = ring.len();
    let ctx = RingContext::new(ring, commitments, pseudo_out)?;
    if secret_index >= n {
        return Err(CryptoError::RingShape(format!(
            "secret index {secret_index} out of ring of {n}"
        )));
    }

    let h_l = ctx.hashed[secret_index];
    let key_image_pt = secret_key * h_l;
    let key_image = compress(&key_image_pt);
    let d_full = mask_delta * h_l;
    let commitment_image = compress(&(inv_eight() * d_full));

    let (mu_p, mu_c) =
        aggregation_coefficients(ring, commitments, &key_image, &commitment_image, pseudo_out);

    // Real-row nonce and first challenge.
    let alpha = random_scalar(rng);
    let l0 = compress(&(alpha * ED25519_BASEPOINT_POINT));
    let r0 = compress(&(alpha * h_l));
    let mut c = round_challenge(ring, commitments, pseudo_out, message, &l0, &r0);

    let mut s = vec![Scalar::ZERO; n];
    let mut c1: Option<Scalar> = None;

    let mut i = (secret_index + 1) % n;
    if i == 0 {
        c1 = Some(c);
    }
    while i != secret_index {
        let s_i = random_scalar(rng);
        s[i] = s_i;

        let (l_i, r_i) = decoy_row(&ctx, i, &s_i, &c, &mu_p, &mu_c, &key_image_pt, &d_full);
        c = round_challenge(
            ring,
            commitments,
            pseudo_out,
            message,
            &compress(&l_i),
            &compress(&r_i),
        );

        i = (i + 1) % n;
        if i == 0 {
            c1 = Some(c);
        }
    }

    // Close the ring.
    let s_l = alpha - c * (mu_p * secret_key + mu_c * mask_delta);
    s[secret_index] = s_l;

    // Single-member rings never wrap through index 0 before closing, so c1
    // is computed from the closed row itself.
    let c1 = match c1 {
        Some(c1) => c1,
        None => {
            let (l_i, r_i) = decoy_row(
                &ctx,
                secret_index,
                &s_l,
                &c,
                &mu_p,
                &mu_c,
                &key_image_pt,
                &d_full,
            );
            round_challenge(
                ring,
                commitments,
                pseudo_out,
                message,
                &compress(&l_i),
                &compress(&r_i),
            )
        }
    };

    Ok(ClsagSignature {
        s,
        c1,
        key_image,
        commitment_image,
    })
}

/// One ring row: `L = s·G + c·μ_P·P + c·μ_C·ΔC`, `R = s·H_p(P) + c·μ_P·I + c·μ_C·D`.
#[allow(clippy::too_many_arguments)]
fn decoy_row(
    ctx: &RingContext,
    i: usize,
    s_i: &Scalar,
    c: &Scalar,
    mu_p: &Scalar,
    mu_c: &Scalar,
    key_image: &EdwardsPoint,
    d_full: &EdwardsPoint,
) -> (EdwardsPoint, EdwardsPoint) {
    let c_mu_p = c * mu_p;
    let c_mu_c = c * mu_c;
    let l = EdwardsPoint::vartime_multiscalar_mul(
        [*s_i, c_mu_p, c_mu_c],
        [ED25519_BASEPOINT_POINT, ctx.points[i], ctx.c_diff[i]],
    );
    let r = EdwardsPoint::vartime_multiscalar_mul(
        [*s_i, c_mu_p, c_mu_c],
        [ctx.hashed[i], *key_image, *d_full],
    );
    (l, r)
}

/// Verify by walking every row from `c1` and checking the challenge wraps
/// back to `c1`.
pub fn verify(
    message: &[u8; 32],
    sig: &ClsagSignature,
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
) -> bool {
    let n = ring.len();
    if n == 0 || sig.s.len() != n || commitments.len() != n {
        return false;
    }
    let ctx = match RingContext::new(ring, commitments, pseudo_out) {
        Ok(ctx) => ctx,
        Err(_) => return false,
    };
    let key_image_pt = match decompress(&sig.key_image) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let d_full = match decompress(&sig.commitment_image) {
        Ok(p) => mul8(&p),
        Err(_) => return false,
    };

    let (mu_p, mu_c) = aggregation_coefficients(
        ring,
        commitments,
        &sig.key_image,
        &sig.commitment_image,
        pseudo_out,
    );

    let mut c = sig.c1;
    for i in 0..n {
        let (l_i, r_i) = decoy_row(&ctx, i, &sig.s[i], &c, &mu_p, &mu_c, &key_image_pt, &d_full);
        c = round_challenge(
            ring,
            commitments,
            pseudo_out,
            message,
            &compress(&l_i),
            &compress(&r_i),
        );
    }
    c == sig.c1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::commit;
    use crate::ecc::scalar_mult_base;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        ring: Vec<[u8; 32]>,
        commitments: Vec<[u8; 32]>,
        pseudo_out: [u8; 32],
        secret: Scalar,
        delta: Scalar,
        index: usize,
    }

    fn fixture(rng: &mut StdRng, n: usize, index: usize, amount: u64) -> Fixture {
        let mut ring = Vec::with_capacity(n);
        let mut commitments = Vec::with_capacity(n);
        let mut secret = Scalar::ZERO;
        let mut real_mask = Scalar::ZERO;
        for i in 0..n {
            let sk = random_scalar(rng);
            let mask = random_scalar(rng);
            ring.push(compress(&scalar_mult_base(&sk)));
            commitments.push(compress(&commit(amount, &mask)));
            if i == index {
                secret = sk;
                real_mask = mask;
            }
        }
        let pseudo_mask = random_scalar(rng);
        let pseudo_out = compress(&commit(amount, &pseudo_mask));
        Fixture {
            ring,
            commitments,
            pseudo_out,
            secret,
            delta: real_mask - pseudo_mask,
            index,
        }
    }

    #[test]
    fn sign_verify_standard_rings() {
        let mut rng = StdRng::seed_from_u64(61);
        for (n, index) in [(2, 0), (11, 5), (16, 15)] {
            let f = fixture(&mut rng, n, index, 1_000);
            let msg = crate::keccak256(b"clsag ring test");
            let sig = sign(
                &mut rng,
                &msg,
                &f.ring,
                &f.commitments,
                &f.pseudo_out,
                &f.secret,
                &f.delta,
                f.index,
            )
            .unwrap();
            assert!(verify(&msg, &sig, &f.ring, &f.commitments, &f.pseudo_out));
            assert!(!verify(
                &crate::keccak256(b"other message"),
                &sig,
                &f.ring,
                &f.commitments,
                &f.pseudo_out
            ));
        }
    }

    #[test]
    fn sign_verify_single_member_ring() {
        let mut rng = StdRng::seed_from_u64(62);
        let f = fixture(&mut rng, 1, 0, 77);
        let msg = crate::keccak256(b"single ring");
        let sig = sign(
            &mut rng,
            &msg,
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.secret,
            &f.delta,
            0,
        )
        .unwrap();
        assert!(verify(&msg, &sig, &f.ring, &f.commitments, &f.pseudo_out));
    }

    #[test]
    fn tampering_breaks_verification() {
        let mut rng = StdRng::seed_from_u64(63);
        let f = fixture(&mut rng, 11, 3, 500);
        let msg = crate::keccak256(b"tamper test");
        let sig = sign(
            &mut rng,
            &msg,
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.secret,
            &f.delta,
            3,
        )
        .unwrap();

        let mut bad = sig.clone();
        bad.c1 += Scalar::ONE;
        assert!(!verify(&msg, &bad, &f.ring, &f.commitments, &f.pseudo_out));

        let mut bad = sig.clone();
        bad.s[7] += Scalar::ONE;
        assert!(!verify(&msg, &bad, &f.ring, &f.commitments, &f.pseudo_out));

        let mut bad_ring = f.ring.clone();
        bad_ring.swap(1, 2);
        assert!(!verify(&msg, &sig, &bad_ring, &f.commitments, &f.pseudo_out));

        let mut bad_comm = f.commitments.clone();
        bad_comm[0] = bad_comm[1];
        assert!(!verify(&msg, &sig, &f.ring, &bad_comm, &f.pseudo_out));
    }

    #[test]
    fn key_image_stable_across_messages() {
        let mut rng = StdRng::seed_from_u64(64);
        let f = fixture(&mut rng, 2, 1, 9);
        let sig1 = sign(
            &mut rng,
            &crate::keccak256(b"m1"),
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.secret,
            &f.delta,
            1,
        )
        .unwrap();
        let sig2 = sign(
            &mut rng,
            &crate::keccak256(b"m2"),
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.secret,
            &f.delta,
            1,
        )
        .unwrap();
        assert_eq!(sig1.key_image, sig2.key_image);
        assert_eq!(sig1.commitment_image, sig2.commitment_image);
        assert_ne!(sig1.c1, sig2.c1);
    }

    #[test]
    fn shape_errors_reported() {
        let mut rng = StdRng::seed_from_u64(65);
        let f = fixture(&mut rng, 3, 0, 1);
        let msg = [0u8; 32];
        assert!(matches!(
            sign(
                &mut rng,
                &msg,
                &f.ring,
                &f.commitments[..2],
                &f.pseudo_out,
                &f.secret,
                &f.delta,
                0
            ),
            Err(CryptoError::RingShape(_))
        ));
        assert!(matches!(
            sign(
                &mut rng,
                &msg,
                &f.ring,
                &f.commitments,
                &f.pseudo_out,
                &f.secret,
                &f.delta,
                3
            ),
            Err(CryptoError::RingShape(_))
        ));
    }
}
