//! Signing pipeline: pseudo-output balancing, the p_r proof, the
//! aggregated range proof, and one ring signature per input.
//!
//! Order is load-bearing: the rct-base (including salvium_data) must be
//! final before the pre-MLSAG message is hashed, because the ring
//! signatures commit to it.

use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};

use salvium_crypto::ecc::{compress, random_scalar};
use salvium_crypto::{bulletproofs_plus, clsag, commitment, pr_proof, tclsag};
use salvium_types::RctType;

use crate::builder::{PreparedInput, UnsignedTransaction};
use crate::hash::{bp_components, pre_mlsag_hash, prefix_hash};
use crate::serialize::serialize_rct_base;
use crate::types::*;
use crate::TxError;

/// Coarse checkpoints reported while signing. The engine never owns the
/// sink; callers that want progress pass one in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignStage {
    PseudoOutputs,
    RangeProof,
    /// (signed, total)
    RingSignature(usize, usize),
    Assembled,
}

/// Sign an unsigned transaction into a self-contained `Transaction`.
/// No secret scalar reaches the returned value.
pub fn sign_transaction<R: RngCore + CryptoRng>(
    rng: &mut R,
    unsigned: UnsignedTransaction,
) -> Result<Transaction, TxError> {
    sign_transaction_with_progress(rng, unsigned, |_| {})
}

/// `sign_transaction` with a progress sink invoked at each stage.
pub fn sign_transaction_with_progress<R: RngCore + CryptoRng>(
    rng: &mut R,
    unsigned: UnsignedTransaction,
    mut progress: impl FnMut(SignStage),
) -> Result<Transaction, TxError> {
    if unsigned.inputs.is_empty() {
        return Err(TxError::Signature("no inputs to sign".into()));
    }
    let use_tclsag = unsigned.rct_type.uses_tclsag();

    // Pseudo-outs close the commitment sum: the last mask balances the
    // output masks exactly.
    let (pseudo_masks, pseudo_outs) =
        balance_pseudo_outputs(rng, &unsigned.inputs, &unsigned.output_masks);
    progress(SignStage::PseudoOutputs);

    // Δ and its Schnorr proof. Exact balancing makes Δ zero, but both the
    // point and the proof are computed from the actual sums.
    let delta = pseudo_masks.iter().sum::<Scalar>()
        - unsigned.output_masks.iter().sum::<Scalar>();
    let p_r = pr_proof::p_r_point(&delta);

    let salvium_data = if unsigned.rct_type.has_salvium_data() {
        let proof = pr_proof::generate(rng, &delta);
        let data_type = if unsigned.rct_type == RctType::SalviumOne { 2 } else { 0 };
        Some(SalviumData {
            data_type,
            pr_proof: ZkProof {
                r: proof.r,
                z1: proof.z1.to_bytes(),
                z2: proof.z2.to_bytes(),
            },
            sa_proof: ZkProof::zeros(),
        })
    } else {
        None
    };

    // Aggregated range proof over all outputs. AUDIT transactions have no
    // outputs and therefore no proof.
    let bulletproofs_plus = if unsigned.output_amounts.is_empty() {
        Vec::new()
    } else {
        let proof = bulletproofs_plus::prove(rng, &unsigned.output_amounts, &unsigned.output_masks)
            .map_err(|e| TxError::RangeProof(e.to_string()))?;
        vec![BpPlusData {
            a: compress(&proof.a),
            a1: compress(&proof.a1),
            b: compress(&proof.b),
            r1: proof.r1.to_bytes(),
            s1: proof.s1.to_bytes(),
            d1: proof.d1.to_bytes(),
            l: proof.l.iter().map(compress).collect(),
            r: proof.r.iter().map(compress).collect(),
        }]
    };
    progress(SignStage::RangeProof);

    // rct-base must be complete before the message hash.
    let mut rct = RctSignatures {
        rct_type: unsigned.rct_type,
        txn_fee: unsigned.fee,
        ecdh_info: unsigned.encrypted_amounts.clone(),
        out_pk: unsigned.output_commitments.clone(),
        p_r,
        salvium_data,
        bulletproofs_plus,
        clsags: Vec::new(),
        tclsags: Vec::new(),
        pseudo_outs: pseudo_outs.clone(),
    };

    let bp_bytes = rct
        .bulletproofs_plus
        .first()
        .map(bp_components)
        .unwrap_or_default();
    let message = pre_mlsag_hash(
        &prefix_hash(&unsigned.prefix)?,
        &serialize_rct_base(&rct),
        &bp_bytes,
    );

    for (i, input) in unsigned.inputs.iter().enumerate() {
        let mask_delta = input.mask - pseudo_masks[i];
        if use_tclsag {
            let secret_y = input.secret_key_y.unwrap_or(Scalar::ZERO);
            let sig = tclsag::sign(
                rng,
                &message,
                &input.ring,
                &input.ring_commitments,
                &pseudo_outs[i],
                &input.secret_key,
                &secret_y,
                &mask_delta,
                input.real_index,
            )
            .map_err(|e| TxError::Signature(format!("input {i}: {e}")))?;
            rct.tclsags.push(TclsagData {
                sx: sig.sx.iter().map(Scalar::to_bytes).collect(),
                sy: sig.sy.iter().map(Scalar::to_bytes).collect(),
                c1: sig.c1.to_bytes(),
                d: sig.commitment_image,
            });
        } else {
            let sig = clsag::sign(
                rng,
                &message,
                &input.ring,
                &input.ring_commitments,
                &pseudo_outs[i],
                &input.secret_key,
                &mask_delta,
                input.real_index,
            )
            .map_err(|e| TxError::Signature(format!("input {i}: {e}")))?;
            rct.clsags.push(ClsagData {
                s: sig.s.iter().map(Scalar::to_bytes).collect(),
                c1: sig.c1.to_bytes(),
                d: sig.commitment_image,
            });
        }
        progress(SignStage::RingSignature(i + 1, unsigned.inputs.len()));
    }

    progress(SignStage::Assembled);
    Ok(Transaction {
        prefix: unsigned.prefix,
        rct: Some(rct),
    })
}

/// n−1 random masks, the last chosen so Σ pseudo_masks = Σ output_masks.
/// Commitments carry the true input amounts under the new masks.
fn balance_pseudo_outputs<R: RngCore + CryptoRng>(
    rng: &mut R,
    inputs: &[PreparedInput],
    output_masks: &[Scalar],
) -> (Vec<Scalar>, Vec<[u8; 32]>) {
    let n = inputs.len();
    let target = output_masks.iter().sum::<Scalar>();

    let mut masks = Vec::with_capacity(n);
    let mut partial = Scalar::ZERO;
    for _ in 0..n - 1 {
        let mask = random_scalar(rng);
        partial += mask;
        masks.push(mask);
    }
    masks.push(target - partial);

    let pseudo_outs = inputs
        .iter()
        .zip(&masks)
        .map(|(input, mask)| compress(&commitment::commit(input.amount, mask)))
        .collect();
    (masks, pseudo_outs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::edwards::EdwardsPoint;
    use curve25519_dalek::traits::Identity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use salvium_crypto::ecc::{decompress, h_point, scalar_mult_base};

    fn pseudo_input(rng: &mut StdRng, amount: u64) -> PreparedInput {
        let secret = random_scalar(rng);
        let public_key = compress(&scalar_mult_base(&secret));
        let mask = random_scalar(rng);
        PreparedInput {
            secret_key: secret,
            secret_key_y: None,
            public_key,
            amount,
            mask,
            asset_type: "SAL".into(),
            ring: vec![public_key],
            ring_commitments: vec![compress(&commitment::commit(amount, &mask))],
            ring_indices: vec![0],
            real_index: 0,
        }
    }

    #[test]
    fn pseudo_masks_balance() {
        let mut rng = StdRng::seed_from_u64(121);
        let inputs = vec![
            pseudo_input(&mut rng, 1_000),
            pseudo_input(&mut rng, 2_000),
            pseudo_input(&mut rng, 3_000),
        ];
        let out_masks = vec![random_scalar(&mut rng), random_scalar(&mut rng)];
        let (masks, outs) = balance_pseudo_outputs(&mut rng, &inputs, &out_masks);
        assert_eq!(masks.len(), 3);
        assert_eq!(outs.len(), 3);
        assert_eq!(
            masks.iter().sum::<Scalar>(),
            out_masks.iter().sum::<Scalar>()
        );
    }

    #[test]
    fn pseudo_outs_cancel_to_amounts() {
        // Σ C'_i − Σ mask_i·G must equal Σ amount_i·H.
        let mut rng = StdRng::seed_from_u64(122);
        let inputs = vec![pseudo_input(&mut rng, 500), pseudo_input(&mut rng, 700)];
        let out_masks = vec![random_scalar(&mut rng)];
        let (masks, outs) = balance_pseudo_outputs(&mut rng, &inputs, &out_masks);

        let mut sum = EdwardsPoint::identity();
        for po in &outs {
            sum += decompress(po).unwrap();
        }
        let mask_part = scalar_mult_base(&masks.iter().sum::<Scalar>());
        assert_eq!(sum - mask_part, Scalar::from(1_200u64) * h_point());
    }

    #[test]
    fn single_input_mask_equals_output_sum() {
        let mut rng = StdRng::seed_from_u64(123);
        let inputs = vec![pseudo_input(&mut rng, 10)];
        let out_masks = vec![random_scalar(&mut rng), random_scalar(&mut rng)];
        let (masks, _) = balance_pseudo_outputs(&mut rng, &inputs, &out_masks);
        assert_eq!(masks[0], out_masks.iter().sum::<Scalar>());
    }
}
