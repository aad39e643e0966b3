//! Transaction hashing: the three section hashes, the transaction id,
//! and the pre-MLSAG message that CLSAG/TCLSAG actually sign.

use salvium_crypto::keccak256;
use salvium_types::RctType;

use crate::serialize::{serialize_prefix, serialize_rct_base, serialize_rct_prunable};
use crate::types::{BpPlusData, Transaction, TxPrefix};
use crate::TxError;

pub fn prefix_hash(prefix: &TxPrefix) -> Result<[u8; 32], TxError> {
    Ok(keccak256(&serialize_prefix(prefix)?))
}

/// Transaction id. Coinbase transactions (type-null RCT or no RCT at all)
/// hash to just the prefix hash; everything else is
/// `keccak(prefix_hash ‖ base_hash ‖ prunable_hash)`.
pub fn tx_hash(tx: &Transaction) -> Result<[u8; 32], TxError> {
    let prefix = prefix_hash(&tx.prefix)?;
    let rct = match &tx.rct {
        Some(rct) if rct.rct_type != RctType::Null => rct,
        _ => return Ok(prefix),
    };
    let base_hash = keccak256(&serialize_rct_base(rct));
    let prunable_hash = keccak256(&serialize_rct_prunable(rct));
    let mut combined = [0u8; 96];
    combined[..32].copy_from_slice(&prefix);
    combined[32..64].copy_from_slice(&base_hash);
    combined[64..].copy_from_slice(&prunable_hash);
    Ok(keccak256(&combined))
}

/// Flat concatenation of the BP+ components hashed into the signed
/// message: `A ‖ A1 ‖ B ‖ r1 ‖ s1 ‖ d1 ‖ L… ‖ R…` with no length prefixes.
pub fn bp_components(bp: &BpPlusData) -> Vec<u8> {
    let mut buf = Vec::with_capacity(6 * 32 + (bp.l.len() + bp.r.len()) * 32);
    buf.extend_from_slice(&bp.a);
    buf.extend_from_slice(&bp.a1);
    buf.extend_from_slice(&bp.b);
    buf.extend_from_slice(&bp.r1);
    buf.extend_from_slice(&bp.s1);
    buf.extend_from_slice(&bp.d1);
    for l in &bp.l {
        buf.extend_from_slice(l);
    }
    for r in &bp.r {
        buf.extend_from_slice(r);
    }
    buf
}

/// The message CLSAG/TCLSAG sign:
/// `keccak(prefix_hash ‖ keccak(rct_base) ‖ keccak(bp_components))`.
pub fn pre_mlsag_hash(
    prefix_hash: &[u8; 32],
    rct_base_bytes: &[u8],
    bp_component_bytes: &[u8],
) -> [u8; 32] {
    let mut combined = [0u8; 96];
    combined[..32].copy_from_slice(prefix_hash);
    combined[32..64].copy_from_slice(&keccak256(rct_base_bytes));
    combined[64..].copy_from_slice(&keccak256(bp_component_bytes));
    keccak256(&combined)
}

/// Signed message for a full transaction value.
pub fn signing_message(tx: &Transaction) -> Result<[u8; 32], TxError> {
    let rct = tx
        .rct
        .as_ref()
        .ok_or_else(|| TxError::InvalidInput("transaction has no rct section".into()))?;
    let bp = rct
        .bulletproofs_plus
        .first()
        .ok_or_else(|| TxError::InvalidInput("transaction has no range proof".into()))?;
    Ok(pre_mlsag_hash(
        &prefix_hash(&tx.prefix)?,
        &serialize_rct_base(rct),
        &bp_components(bp),
    ))
}
