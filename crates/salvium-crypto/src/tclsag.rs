//! TCLSAG: twin-generator CLSAG for SalviumOne transactions.
//!
//! The real row carries two secrets `(x, y)` with `P_ℓ = x·G + y·T` and
//! every row gets two response scalars. Inputs created before the CARROT
//! fork have no T component; they sign with `y = 0`.
//!
//! The aggregation and round transcripts are shared with CLSAG.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand::{CryptoRng, RngCore};

use crate::clsag::{aggregation_coefficients, round_challenge, RingContext};
use crate::ecc::{compress, decompress, inv_eight, mul8, random_scalar, t_point};
use crate::CryptoError;

#[derive(Debug, Clone)]
pub struct TclsagSignature {
    pub sx: Vec<Scalar>,
    pub sy: Vec<Scalar>,
    pub c1: Scalar,
    /// `I = x·H_p(P_ℓ)`.
    pub key_image: [u8; 32],
    /// `⅛·z·H_p(P_ℓ)`.
    pub commitment_image: [u8; 32],
}

/// Sign with the twin secret `(x, y)`; pass `y = 0` for legacy inputs.
#[allow(clippy::too_many_arguments)]
pub fn sign<R: RngCore + CryptoRng>(
    rng: &mut R,
    message: &[u8; 32],
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
    secret_x: &Scalar,
    secret_y: &Scalar,
    mask_delta: &Scalar,
    secret_index: usize,
) -> Result<TclsagSignature, CryptoError> {
    let n = ring.len();
    let ctx = RingContext::new(ring, commitments, pseudo_out)?;
    if secret_index >= n {
        return Err(CryptoError::RingShape(format!(
            "secret index {secret_index} out of ring of {n}"
        )));
    }

    let h_l = ctx.hashed[secret_index];
    let key_image_pt = secret_x * h_l;
    let key_image = compress(&key_image_pt);
    let d_full = mask_delta * h_l;
    let commitment_image = compress(&(inv_eight() * d_full));

    let (mu_p, mu_c) =
        aggregation_coefficients(ring, commitments, &key_image, &commitment_image, pseudo_out);

    // Two nonces for the real row: L = a·G + b·T, R = a·H_p(P_ℓ).
    let a = random_scalar(rng);
    let b = random_scalar(rng);
    let l0 = EdwardsPoint::vartime_multiscalar_mul([a, b], [ED25519_BASEPOINT_POINT, t_point()]);
    let r0 = a * h_l;
    let mut c = round_challenge(
        ring,
        commitments,
        pseudo_out,
        message,
        &compress(&l0),
        &compress(&r0),
    );

    let mut sx = vec![Scalar::ZERO; n];
    let mut sy = vec![Scalar::ZERO; n];
    let mut c1: Option<Scalar> = None;

    let mut i = (secret_index + 1) % n;
    if i == 0 {
        c1 = Some(c);
    }
    while i != secret_index {
        let sx_i = random_scalar(rng);
        let sy_i = random_scalar(rng);
        sx[i] = sx_i;
        sy[i] = sy_i;

        let (l_i, r_i) = twin_row(&ctx, i, &sx_i, &sy_i, &c, &mu_p, &mu_c, &key_image_pt, &d_full);
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

    // Close both responses.
    let sx_l = a - c * (mu_p * secret_x + mu_c * mask_delta);
    let sy_l = b - c * mu_p * secret_y;
    sx[secret_index] = sx_l;
    sy[secret_index] = sy_l;

    let c1 = match c1 {
        Some(c1) => c1,
        None => {
            let (l_i, r_i) = twin_row(
                &ctx,
                secret_index,
                &sx_l,
                &sy_l,
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

    Ok(TclsagSignature {
        sx,
        sy,
        c1,
        key_image,
        commitment_image,
    })
}

/// `L = sx·G + sy·T + c·μ_P·P + c·μ_C·ΔC`, `R = sx·H_p(P) + c·μ_P·I + c·μ_C·D`.
#[allow(clippy::too_many_arguments)]
fn twin_row(
    ctx: &RingContext,
    i: usize,
    sx_i: &Scalar,
    sy_i: &Scalar,
    c: &Scalar,
    mu_p: &Scalar,
    mu_c: &Scalar,
    key_image: &EdwardsPoint,
    d_full: &EdwardsPoint,
) -> (EdwardsPoint, EdwardsPoint) {
    let c_mu_p = c * mu_p;
    let c_mu_c = c * mu_c;
    let l = EdwardsPoint::vartime_multiscalar_mul(
        [*sx_i, *sy_i, c_mu_p, c_mu_c],
        [ED25519_BASEPOINT_POINT, t_point(), ctx.points[i], ctx.c_diff[i]],
    );
    let r = EdwardsPoint::vartime_multiscalar_mul(
        [*sx_i, c_mu_p, c_mu_c],
        [ctx.hashed[i], *key_image, *d_full],
    );
    (l, r)
}

pub fn verify(
    message: &[u8; 32],
    sig: &TclsagSignature,
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
) -> bool {
    let n = ring.len();
    if n == 0 || sig.sx.len() != n || sig.sy.len() != n || commitments.len() != n {
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
        let (l_i, r_i) = twin_row(
            &ctx,
            i,
            &sig.sx[i],
            &sig.sy[i],
            &c,
            &mu_p,
            &mu_c,
            &key_image_pt,
            &d_full,
        );
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

    fn twin_pubkey(x: &Scalar, y: &Scalar) -> [u8; 32] {
        compress(&EdwardsPoint::vartime_multiscalar_mul(
            [*x, *y],
            [ED25519_BASEPOINT_POINT, t_point()],
        ))
    }

    struct Fixture {
        ring: Vec<[u8; 32]>,
        commitments: Vec<[u8; 32]>,
        pseudo_out: [u8; 32],
        x: Scalar,
        y: Scalar,
        delta: Scalar,
        index: usize,
    }

    fn fixture(rng: &mut StdRng, n: usize, index: usize, y_zero: bool) -> Fixture {
        let x = random_scalar(rng);
        let y = if y_zero { Scalar::ZERO } else { random_scalar(rng) };
        let mut ring = Vec::with_capacity(n);
        let mut commitments = Vec::with_capacity(n);
        let mut real_mask = Scalar::ZERO;
        for i in 0..n {
            if i == index {
                ring.push(twin_pubkey(&x, &y));
            } else {
                ring.push(twin_pubkey(&random_scalar(rng), &random_scalar(rng)));
            }
            let mask = random_scalar(rng);
            commitments.push(compress(&commit(42, &mask)));
            if i == index {
                real_mask = mask;
            }
        }
        let pseudo_mask = random_scalar(rng);
        Fixture {
            ring,
            commitments,
            pseudo_out: compress(&commit(42, &pseudo_mask)),
            x,
            y,
            delta: real_mask - pseudo_mask,
            index,
        }
    }

    #[test]
    fn sign_verify_rings() {
        let mut rng = StdRng::seed_from_u64(71);
        for (n, index) in [(1, 0), (4, 2), (16, 9)] {
            let f = fixture(&mut rng, n, index, false);
            let msg = crate::keccak256(b"tclsag ring");
            let sig = sign(
                &mut rng,
                &msg,
                &f.ring,
                &f.commitments,
                &f.pseudo_out,
                &f.x,
                &f.y,
                &f.delta,
                f.index,
            )
            .unwrap();
            assert!(verify(&msg, &sig, &f.ring, &f.commitments, &f.pseudo_out));
            assert!(!verify(
                &crate::keccak256(b"wrong"),
                &sig,
                &f.ring,
                &f.commitments,
                &f.pseudo_out
            ));
        }
    }

    #[test]
    fn legacy_input_signs_with_zero_y() {
        // A pure-G key is a twin key with y = 0.
        let mut rng = StdRng::seed_from_u64(72);
        let mut f = fixture(&mut rng, 8, 5, true);
        f.ring[5] = compress(&scalar_mult_base(&f.x));
        let msg = crate::keccak256(b"legacy under tclsag");
        let sig = sign(
            &mut rng,
            &msg,
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.x,
            &Scalar::ZERO,
            &f.delta,
            5,
        )
        .unwrap();
        assert!(verify(&msg, &sig, &f.ring, &f.commitments, &f.pseudo_out));
    }

    #[test]
    fn tampering_breaks_verification() {
        let mut rng = StdRng::seed_from_u64(73);
        let f = fixture(&mut rng, 11, 4, false);
        let msg = crate::keccak256(b"tclsag tamper");
        let sig = sign(
            &mut rng,
            &msg,
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.x,
            &f.y,
            &f.delta,
            4,
        )
        .unwrap();

        let mut bad = sig.clone();
        bad.sy[2] += Scalar::ONE;
        assert!(!verify(&msg, &bad, &f.ring, &f.commitments, &f.pseudo_out));

        let mut bad = sig.clone();
        bad.sx[0] += Scalar::ONE;
        assert!(!verify(&msg, &bad, &f.ring, &f.commitments, &f.pseudo_out));

        let mut bad = sig.clone();
        bad.c1 += Scalar::ONE;
        assert!(!verify(&msg, &bad, &f.ring, &f.commitments, &f.pseudo_out));
    }

    #[test]
    fn key_image_consistency() {
        let mut rng = StdRng::seed_from_u64(74);
        let f = fixture(&mut rng, 2, 0, false);
        let s1 = sign(
            &mut rng,
            &crate::keccak256(b"a"),
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.x,
            &f.y,
            &f.delta,
            0,
        )
        .unwrap();
        let s2 = sign(
            &mut rng,
            &crate::keccak256(b"b"),
            &f.ring,
            &f.commitments,
            &f.pseudo_out,
            &f.x,
            &f.y,
            &f.delta,
            0,
        )
        .unwrap();
        assert_eq!(s1.key_image, s2.key_image);
        assert_eq!(s1.commitment_image, s2.commitment_image);
    }
}
