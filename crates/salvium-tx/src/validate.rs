//! Fork-aware transaction validation.
//!
//! The validator accumulates every issue it finds instead of stopping at
//! the first, so mempool and debugging callers see the whole picture.
//! Structural and semantic checks always run; the cryptographic checks
//! run only when the transaction is shaped well enough to attempt them.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;

use salvium_crypto::ecc::{canonical_scalar, decompress, inv_eight, h_point};
use salvium_crypto::{bulletproofs_plus, clsag, pr_proof, tclsag};
use salvium_types::consensus::{
    calculate_required_fee, is_tx_blacklisted, max_tx_weight, rct_type_for_hf, tx_version_allowed,
    FEE_TOLERANCE_DIVISOR,
};
use salvium_types::{
    is_audit_hf, AssetType, HfVersion, OutputTarget, RctType, TxType, DEFAULT_RING_SIZE,
    LEGACY_RING_SIZE,
};

use crate::fee::bp_plus_clawback;
use crate::hash::{bp_components, pre_mlsag_hash, prefix_hash, tx_hash};
use crate::serialize::{serialize_rct_base, serialize_transaction};
use crate::types::*;

/// Error families surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    InvalidInput,
    InsufficientFunds,
    RingShape,
    ForkViolation,
    SignatureFailure,
    RangeProofFailure,
    FeeShortfall,
    Overflow,
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

/// One fetched ring per input: members and their commitments in offset
/// order. The caller performs the daemon I/O; the engine only checks.
#[derive(Debug, Clone)]
pub struct MixRing {
    pub keys: Vec<[u8; 32]>,
    pub commitments: Vec<[u8; 32]>,
}

pub struct ValidationContext<'a> {
    pub hf_version: u8,
    /// Required for coinbase height matching.
    pub block_height: Option<u64>,
    /// Current block reward, for the dynamic fee.
    pub base_reward: u64,
    /// One mix ring per input, in prefix order.
    pub mix_rings: &'a [MixRing],
}

struct Checker {
    errors: Vec<ValidationIssue>,
}

impl Checker {
    fn push(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            kind,
            message: message.into(),
        });
    }
}

/// Run the full pipeline: structural → semantic → cryptographic.
pub fn validate_transaction(tx: &Transaction, ctx: &ValidationContext) -> ValidationReport {
    let mut chk = Checker { errors: Vec::new() };

    check_type_and_version(tx, ctx, &mut chk);
    check_asset_types(tx, &mut chk);
    check_outputs(tx, ctx, &mut chk);
    let inputs_ok = check_inputs(tx, ctx, &mut chk);
    check_rct_type(tx, ctx, &mut chk);
    check_extension(tx, &mut chk);
    check_audit_rules(tx, &mut chk);
    check_fee_and_weight(tx, ctx, &mut chk);
    check_blacklist(tx, &mut chk);

    if inputs_ok && !tx.prefix.tx_type.is_coinbase() {
        check_crypto(tx, ctx, &mut chk);
    }

    ValidationReport {
        valid: chk.errors.is_empty(),
        errors: chk.errors,
    }
}

// ─── Structural / semantic ──────────────────────────────────────────────────

fn check_type_and_version(tx: &Transaction, ctx: &ValidationContext, chk: &mut Checker) {
    let tx_type = tx.prefix.tx_type;
    if tx_type == TxType::Unset {
        chk.push(IssueKind::ForkViolation, "tx type UNSET");
        return;
    }
    if !tx_version_allowed(tx_type, tx.prefix.version as u8, ctx.hf_version) {
        chk.push(
            IssueKind::ForkViolation,
            format!(
                "version {} not allowed for {} at fork {}",
                tx.prefix.version, tx_type, ctx.hf_version
            ),
        );
    }
    if tx_type == TxType::Convert && ctx.hf_version < HfVersion::ENABLE_CONVERT {
        chk.push(IssueKind::ForkViolation, "CONVERT before its enabling fork");
    }
    if tx_type == TxType::Audit && !is_audit_hf(ctx.hf_version) {
        chk.push(
            IssueKind::ForkViolation,
            format!("AUDIT outside audit forks (fork {})", ctx.hf_version),
        );
    }
}

fn check_asset_types(tx: &Transaction, chk: &mut Checker) {
    let src = &tx.prefix.source_asset_type;
    let dst = &tx.prefix.destination_asset_type;
    let src_known = AssetType::from_str_opt(src).is_some();
    let dst_known = AssetType::from_str_opt(dst).is_some();
    if !src_known {
        chk.push(IssueKind::ForkViolation, format!("unknown source asset {src}"));
    }
    if !dst_known {
        chk.push(IssueKind::ForkViolation, format!("unknown destination asset {dst}"));
    }
    if !src_known || !dst_known {
        return;
    }

    match tx.prefix.tx_type {
        TxType::Burn => {
            if dst != "BURN" {
                chk.push(IssueKind::ForkViolation, format!("BURN destination {dst}"));
            }
            if src == "BURN" {
                chk.push(IssueKind::ForkViolation, "BURN source is the burn sink");
            }
        }
        TxType::Convert => {
            if src == "BURN" || dst == "BURN" {
                chk.push(IssueKind::ForkViolation, "CONVERT through the burn sink");
            } else if src == dst {
                chk.push(IssueKind::ForkViolation, "CONVERT between identical assets");
            }
        }
        _ => {
            if src == "BURN" {
                chk.push(IssueKind::ForkViolation, "cannot spend BURN");
            }
            if src != dst {
                chk.push(
                    IssueKind::ForkViolation,
                    format!("{src} -> {dst} for {}", tx.prefix.tx_type),
                );
            }
        }
    }
}

fn check_outputs(tx: &Transaction, ctx: &ValidationContext, chk: &mut Checker) {
    let outputs = &tx.prefix.outputs;
    let tx_type = tx.prefix.tx_type;

    // Output-count rules for the special families.
    if tx_type == TxType::Stake && outputs.len() != 1 {
        chk.push(
            IssueKind::ForkViolation,
            format!("STAKE must have exactly 1 output, has {}", outputs.len()),
        );
    }
    if tx_type == TxType::Audit && !outputs.is_empty() {
        chk.push(
            IssueKind::ForkViolation,
            format!("AUDIT must have 0 outputs, has {}", outputs.len()),
        );
    }

    // Target types: uniform, and CarrotV1-only after the fork.
    if let Some(first) = outputs.first() {
        let first_target = first.target();
        if outputs.iter().any(|o| o.target() != first_target) {
            chk.push(IssueKind::ForkViolation, "mixed output target types");
        }
    }
    if ctx.hf_version >= HfVersion::CARROT && !tx_type.is_coinbase() {
        for (i, o) in outputs.iter().enumerate() {
            if o.target() != OutputTarget::CarrotV1 {
                chk.push(
                    IssueKind::ForkViolation,
                    format!("output {i} not carrot_v1 after the CARROT fork"),
                );
                break;
            }
        }
    }

    // Enote sort rule.
    if ctx.hf_version >= HfVersion::CARROT {
        for i in 1..outputs.len() {
            if outputs[i].key() < outputs[i - 1].key() {
                chk.push(IssueKind::ForkViolation, "outputs not sorted by one-time key");
                break;
            }
        }
    }

    // Amount overflow.
    let mut total: u64 = 0;
    for o in outputs {
        match total.checked_add(o.amount()) {
            Some(t) => total = t,
            None => {
                chk.push(IssueKind::Overflow, "output amounts overflow u64");
                break;
            }
        }
    }
}

/// Returns whether the inputs are shaped well enough for crypto checks.
fn check_inputs(tx: &Transaction, ctx: &ValidationContext, chk: &mut Checker) -> bool {
    let inputs = &tx.prefix.inputs;
    if inputs.is_empty() {
        chk.push(IssueKind::RingShape, "no inputs");
        return false;
    }

    if tx.prefix.tx_type.is_coinbase() {
        if inputs.len() != 1 {
            chk.push(IssueKind::RingShape, "coinbase needs exactly one input");
            return false;
        }
        match (&inputs[0], ctx.block_height) {
            (TxInput::Gen { height }, Some(block_height)) if *height != block_height => {
                chk.push(
                    IssueKind::ForkViolation,
                    format!("gen input height {height} != block height {block_height}"),
                );
            }
            (TxInput::Gen { .. }, _) => {}
            (TxInput::Key { .. }, _) => {
                chk.push(IssueKind::RingShape, "coinbase input is not a gen input");
            }
        }
        return false;
    }

    let mut ok = true;
    let expected_ring = if ctx.hf_version >= HfVersion::CARROT {
        DEFAULT_RING_SIZE
    } else {
        LEGACY_RING_SIZE
    };
    let mut previous_image: Option<[u8; 32]> = None;
    for (i, input) in inputs.iter().enumerate() {
        match input {
            TxInput::Gen { .. } => {
                chk.push(IssueKind::RingShape, format!("gen input {i} in user tx"));
                ok = false;
            }
            TxInput::Key {
                amount,
                key_offsets,
                key_image,
                ..
            } => {
                if *amount != 0 {
                    chk.push(
                        IssueKind::InvalidInput,
                        format!("input {i} carries cleartext amount {amount}"),
                    );
                }
                if key_offsets.len() != expected_ring {
                    chk.push(
                        IssueKind::RingShape,
                        format!(
                            "input {i} ring size {} != {expected_ring}",
                            key_offsets.len()
                        ),
                    );
                    ok = false;
                }
                if key_offsets.iter().skip(1).any(|&off| off == 0) {
                    chk.push(
                        IssueKind::RingShape,
                        format!("input {i} has duplicate ring offsets"),
                    );
                    ok = false;
                }
                // Prefix order is strictly descending by key image; equal
                // images are double spends within one transaction.
                if let Some(prev) = previous_image {
                    if *key_image >= prev {
                        chk.push(
                            IssueKind::RingShape,
                            "key images not strictly sorted / duplicated",
                        );
                        ok = false;
                    }
                }
                previous_image = Some(*key_image);
            }
        }
    }
    ok
}

fn check_rct_type(tx: &Transaction, ctx: &ValidationContext, chk: &mut Checker) {
    let rct_type = tx.rct.as_ref().map(|r| r.rct_type);
    if tx.prefix.tx_type.is_coinbase() {
        if ctx.hf_version >= HfVersion::REJECT_SIGS_IN_COINBASE
            && rct_type.is_some_and(|t| t != RctType::Null)
        {
            chk.push(IssueKind::ForkViolation, "coinbase carries ring signatures");
        }
        return;
    }
    let required = rct_type_for_hf(ctx.hf_version);
    match rct_type {
        None => chk.push(IssueKind::InvalidInput, "missing rct section"),
        Some(t) if t != required => {
            // The BP+ fork window accepted plain CLSAG as well.
            let grandfathered =
                required == RctType::BulletproofPlus && t == RctType::Clsag;
            if !grandfathered {
                chk.push(
                    IssueKind::ForkViolation,
                    format!("rct type {t:?} instead of {required:?} at fork {}", ctx.hf_version),
                );
            }
        }
        Some(_) => {}
    }
}

fn check_extension(tx: &Transaction, chk: &mut Checker) {
    if let PrefixExtension::ReturnAddressList {
        addresses,
        change_mask,
    } = &tx.prefix.extension
    {
        let n = tx.prefix.outputs.len();
        if addresses.len() != n || change_mask.len() != n {
            chk.push(
                IssueKind::InvalidInput,
                format!(
                    "return list sized {}/{} for {n} outputs",
                    addresses.len(),
                    change_mask.len()
                ),
            );
        }
    }
}

fn check_audit_rules(tx: &Transaction, chk: &mut Checker) {
    if tx.prefix.tx_type != TxType::Audit {
        return;
    }
    if tx.prefix.unlock_time == 0 {
        chk.push(IssueKind::ForkViolation, "AUDIT with zero unlock height");
    }
    if tx.prefix.amount_burnt == 0 {
        chk.push(IssueKind::ForkViolation, "AUDIT with zero audit amount");
    }
    match extra_find_audit_disclosure(&tx.prefix.extra) {
        None => chk.push(IssueKind::InvalidInput, "AUDIT missing disclosure payload"),
        Some((_view, spend)) => {
            if decompress(&spend).is_err() {
                chk.push(
                    IssueKind::InvalidInput,
                    "audit disclosure spend key is not a point",
                );
            }
        }
    }
}

fn check_fee_and_weight(tx: &Transaction, ctx: &ValidationContext, chk: &mut Checker) {
    if tx.prefix.tx_type.is_coinbase() {
        return;
    }
    let Some(rct) = tx.rct.as_ref() else {
        return;
    };
    let Ok(blob) = serialize_transaction(tx) else {
        chk.push(IssueKind::InvalidInput, "transaction does not serialize");
        return;
    };
    let weight = blob.len() as u64 + bp_plus_clawback(tx.prefix.outputs.len());

    let cap = max_tx_weight(ctx.hf_version);
    if weight > cap {
        chk.push(
            IssueKind::FeeShortfall,
            format!("weight {weight} above cap {cap}"),
        );
    }

    let needed = calculate_required_fee(weight, ctx.base_reward, ctx.hf_version);
    let floor = needed - needed / FEE_TOLERANCE_DIVISOR;
    if rct.txn_fee < floor {
        chk.push(
            IssueKind::FeeShortfall,
            format!("fee {} below required {needed}", rct.txn_fee),
        );
    }
}

fn check_blacklist(tx: &Transaction, chk: &mut Checker) {
    if let Ok(hash) = tx_hash(tx) {
        if is_tx_blacklisted(&hex::encode(hash)) {
            chk.push(IssueKind::ForkViolation, "transaction is blacklisted");
        }
    }
}

// ─── Cryptographic ──────────────────────────────────────────────────────────

fn check_crypto(tx: &Transaction, ctx: &ValidationContext, chk: &mut Checker) {
    let Some(rct) = tx.rct.as_ref() else {
        return;
    };
    if rct.rct_type == RctType::Null {
        return;
    }
    let num_inputs = tx.prefix.inputs.len();
    if rct.pseudo_outs.len() != num_inputs {
        chk.push(
            IssueKind::RingShape,
            format!(
                "{} pseudo-outs for {num_inputs} inputs",
                rct.pseudo_outs.len()
            ),
        );
        return;
    }
    if ctx.mix_rings.len() != num_inputs {
        chk.push(
            IssueKind::RingShape,
            format!("{} mix rings supplied for {num_inputs} inputs", ctx.mix_rings.len()),
        );
        return;
    }

    check_range_proof(tx, rct, chk);
    check_pr_proof(rct, chk);
    check_balance(tx, rct, chk);
    check_ring_signatures(tx, rct, ctx, chk);
}

/// Rebuild the ⅛-scaled commitment vector from outPk and verify the
/// aggregated proof.
fn check_range_proof(tx: &Transaction, rct: &RctSignatures, chk: &mut Checker) {
    if tx.prefix.outputs.is_empty() {
        return;
    }
    let Some(bp) = rct.bulletproofs_plus.first() else {
        chk.push(IssueKind::RangeProofFailure, "missing range proof");
        return;
    };
    if rct.bulletproofs_plus.len() != 1 {
        chk.push(
            IssueKind::RangeProofFailure,
            format!("{} range proofs, expected 1", rct.bulletproofs_plus.len()),
        );
        return;
    }

    let proof = match wire_bp_to_proof(bp) {
        Ok(p) => p,
        Err(msg) => {
            chk.push(IssueKind::InvalidInput, msg);
            return;
        }
    };
    let mut v = Vec::with_capacity(rct.out_pk.len());
    for pk in &rct.out_pk {
        match decompress(pk) {
            Ok(p) => v.push(inv_eight() * p),
            Err(_) => {
                chk.push(IssueKind::InvalidInput, "output commitment not a point");
                return;
            }
        }
    }
    if !bulletproofs_plus::verify(&v, &proof) {
        chk.push(IssueKind::RangeProofFailure, "range proof rejected");
    }
}

fn wire_bp_to_proof(
    bp: &BpPlusData,
) -> Result<bulletproofs_plus::BulletproofPlus, String> {
    let point = |b: &[u8; 32], name: &str| {
        decompress(b).map_err(|_| format!("bp {name} is not a point"))
    };
    let scalar = |b: &[u8; 32], name: &str| {
        canonical_scalar(b).map_err(|_| format!("bp {name} is not canonical"))
    };
    let mut l = Vec::with_capacity(bp.l.len());
    for (i, p) in bp.l.iter().enumerate() {
        l.push(point(p, &format!("L[{i}]"))?);
    }
    let mut r = Vec::with_capacity(bp.r.len());
    for (i, p) in bp.r.iter().enumerate() {
        r.push(point(p, &format!("R[{i}]"))?);
    }
    Ok(bulletproofs_plus::BulletproofPlus {
        v: Vec::new(),
        a: point(&bp.a, "A")?,
        a1: point(&bp.a1, "A1")?,
        b: point(&bp.b, "B")?,
        r1: scalar(&bp.r1, "r1")?,
        s1: scalar(&bp.s1, "s1")?,
        d1: scalar(&bp.d1, "d1")?,
        l,
        r,
    })
}

fn check_pr_proof(rct: &RctSignatures, chk: &mut Checker) {
    if !rct.rct_type.has_salvium_data() {
        return;
    }
    let Some(sd) = rct.salvium_data.as_ref() else {
        chk.push(IssueKind::InvalidInput, "missing salvium_data");
        return;
    };
    let (z1, z2) = match (
        canonical_scalar(&sd.pr_proof.z1),
        canonical_scalar(&sd.pr_proof.z2),
    ) {
        (Ok(z1), Ok(z2)) => (z1, z2),
        _ => {
            chk.push(IssueKind::InvalidInput, "pr_proof scalars not canonical");
            return;
        }
    };
    let proof = pr_proof::PrProof {
        r: sd.pr_proof.r,
        z1,
        z2,
    };
    if !pr_proof::verify(&proof, &rct.p_r) {
        chk.push(IssueKind::SignatureFailure, "pr_proof rejected");
    }
}

/// `Σ pseudoOuts = p_r + Σ outPk + (fee + amount_burnt)·H`.
fn check_balance(tx: &Transaction, rct: &RctSignatures, chk: &mut Checker) {
    let mut pseudo_sum = EdwardsPoint::identity();
    for po in &rct.pseudo_outs {
        match decompress(po) {
            Ok(p) => pseudo_sum += p,
            Err(_) => {
                chk.push(IssueKind::InvalidInput, "pseudo-out not a point");
                return;
            }
        }
    }
    let mut out_sum = EdwardsPoint::identity();
    for pk in &rct.out_pk {
        match decompress(pk) {
            Ok(p) => out_sum += p,
            Err(_) => return, // already reported by the range-proof check
        }
    }
    let p_r = match decompress(&rct.p_r) {
        Ok(p) => p,
        Err(_) => {
            chk.push(IssueKind::InvalidInput, "p_r not a point");
            return;
        }
    };
    let declared = rct.txn_fee.wrapping_add(tx.prefix.amount_burnt);
    let expected = p_r + out_sum + Scalar::from(declared) * h_point();
    if pseudo_sum != expected {
        chk.push(
            IssueKind::SignatureFailure,
            "commitment sums do not balance",
        );
    }
}

fn check_ring_signatures(
    tx: &Transaction,
    rct: &RctSignatures,
    ctx: &ValidationContext,
    chk: &mut Checker,
) {
    let bp_bytes = rct
        .bulletproofs_plus
        .first()
        .map(bp_components)
        .unwrap_or_default();
    let message = match prefix_hash(&tx.prefix) {
        Ok(ph) => pre_mlsag_hash(&ph, &serialize_rct_base(rct), &bp_bytes),
        Err(_) => {
            chk.push(IssueKind::InvalidInput, "prefix does not serialize");
            return;
        }
    };

    let use_tclsag = rct.rct_type.uses_tclsag();
    let sig_count = if use_tclsag {
        rct.tclsags.len()
    } else {
        rct.clsags.len()
    };
    if sig_count != tx.prefix.inputs.len() {
        chk.push(
            IssueKind::SignatureFailure,
            format!("{sig_count} signatures for {} inputs", tx.prefix.inputs.len()),
        );
        return;
    }

    for (i, input) in tx.prefix.inputs.iter().enumerate() {
        let Some(key_image) = input.key_image() else {
            continue;
        };
        let ring = &ctx.mix_rings[i];
        let ok = if use_tclsag {
            match wire_tclsag_to_sig(&rct.tclsags[i], key_image) {
                Ok(sig) => tclsag::verify(
                    &message,
                    &sig,
                    &ring.keys,
                    &ring.commitments,
                    &rct.pseudo_outs[i],
                ),
                Err(msg) => {
                    chk.push(IssueKind::InvalidInput, format!("input {i}: {msg}"));
                    continue;
                }
            }
        } else {
            match wire_clsag_to_sig(&rct.clsags[i], key_image) {
                Ok(sig) => clsag::verify(
                    &message,
                    &sig,
                    &ring.keys,
                    &ring.commitments,
                    &rct.pseudo_outs[i],
                ),
                Err(msg) => {
                    chk.push(IssueKind::InvalidInput, format!("input {i}: {msg}"));
                    continue;
                }
            }
        };
        if !ok {
            chk.push(
                IssueKind::SignatureFailure,
                format!("ring signature rejected for input {i}"),
            );
        }
    }
}

fn wire_clsag_to_sig(
    data: &ClsagData,
    key_image: &[u8; 32],
) -> Result<clsag::ClsagSignature, String> {
    let mut s = Vec::with_capacity(data.s.len());
    for (j, b) in data.s.iter().enumerate() {
        s.push(canonical_scalar(b).map_err(|_| format!("s[{j}] not canonical"))?);
    }
    Ok(clsag::ClsagSignature {
        s,
        c1: canonical_scalar(&data.c1).map_err(|_| "c1 not canonical".to_string())?,
        key_image: *key_image,
        commitment_image: data.d,
    })
}

fn wire_tclsag_to_sig(
    data: &TclsagData,
    key_image: &[u8; 32],
) -> Result<tclsag::TclsagSignature, String> {
    let mut sx = Vec::with_capacity(data.sx.len());
    for (j, b) in data.sx.iter().enumerate() {
        sx.push(canonical_scalar(b).map_err(|_| format!("sx[{j}] not canonical"))?);
    }
    let mut sy = Vec::with_capacity(data.sy.len());
    for (j, b) in data.sy.iter().enumerate() {
        sy.push(canonical_scalar(b).map_err(|_| format!("sy[{j}] not canonical"))?);
    }
    Ok(tclsag::TclsagSignature {
        sx,
        sy,
        c1: canonical_scalar(&data.c1).map_err(|_| "c1 not canonical".to_string())?,
        key_image: *key_image,
        commitment_image: data.d,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvium_types::HfVersion;

    fn coinbase_tx(height: u64) -> Transaction {
        Transaction {
            prefix: TxPrefix {
                version: 4,
                unlock_time: height + 60,
                tx_type: TxType::Miner,
                amount_burnt: 0,
                source_asset_type: "SAL".into(),
                destination_asset_type: "SAL".into(),
                amount_slippage_limit: 0,
                inputs: vec![TxInput::Gen { height }],
                outputs: vec![TxOutput::CarrotV1 {
                    amount: 600_000_000_000,
                    key: [0x42; 32],
                    asset_type: "SAL".into(),
                    view_tag: [0, 0, 0],
                    encrypted_anchor: [0u8; 16],
                }],
                extra: Vec::new(),
                extension: PrefixExtension::None,
            },
            rct: Some(RctSignatures {
                rct_type: RctType::Null,
                txn_fee: 0,
                ecdh_info: Vec::new(),
                out_pk: Vec::new(),
                p_r: [0u8; 32],
                salvium_data: None,
                bulletproofs_plus: Vec::new(),
                clsags: Vec::new(),
                tclsags: Vec::new(),
                pseudo_outs: Vec::new(),
            }),
        }
    }

    #[test]
    fn valid_coinbase_accepted() {
        let tx = coinbase_tx(1000);
        let ctx = ValidationContext {
            hf_version: HfVersion::CARROT,
            block_height: Some(1000),
            base_reward: 0,
            mix_rings: &[],
        };
        let report = validate_transaction(&tx, &ctx);
        assert!(report.valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn coinbase_height_mismatch_rejected() {
        let tx = coinbase_tx(1000);
        let ctx = ValidationContext {
            hf_version: HfVersion::CARROT,
            block_height: Some(999),
            base_reward: 0,
            mix_rings: &[],
        };
        let report = validate_transaction(&tx, &ctx);
        assert!(!report.valid);
        assert!(report.has(IssueKind::ForkViolation));
    }

    #[test]
    fn coinbase_with_signatures_rejected() {
        let mut tx = coinbase_tx(5);
        tx.rct.as_mut().unwrap().rct_type = RctType::SalviumOne;
        let ctx = ValidationContext {
            hf_version: HfVersion::CARROT,
            block_height: Some(5),
            base_reward: 0,
            mix_rings: &[],
        };
        assert!(!validate_transaction(&tx, &ctx).valid);
    }

    #[test]
    fn unset_type_rejected() {
        let mut tx = coinbase_tx(5);
        tx.prefix.tx_type = TxType::Unset;
        let ctx = ValidationContext {
            hf_version: HfVersion::CARROT,
            block_height: Some(5),
            base_reward: 0,
            mix_rings: &[],
        };
        let report = validate_transaction(&tx, &ctx);
        assert!(report.has(IssueKind::ForkViolation));
    }

    #[test]
    fn errors_accumulate() {
        let mut tx = coinbase_tx(5);
        tx.prefix.tx_type = TxType::Unset;
        tx.prefix.source_asset_type = "XYZ".into();
        let ctx = ValidationContext {
            hf_version: HfVersion::CARROT,
            block_height: Some(5),
            base_reward: 0,
            mix_rings: &[],
        };
        let report = validate_transaction(&tx, &ctx);
        assert!(report.errors.len() >= 2, "want multiple issues: {:?}", report.errors);
    }
}
