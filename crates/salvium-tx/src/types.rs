//! Typed transaction model.
//!
//! A transaction is a prefix plus optional RingCT signatures. The
//! version/type-conditional trailing fields of the prefix are a tagged
//! enum, so each transaction family carries exactly the fields it needs
//! instead of a bag of optionals.

use salvium_types::{OutputTarget, RctType, TxType};

/// Complete transaction (prefix + RingCT signatures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub prefix: TxPrefix,
    pub rct: Option<RctSignatures>,
}

/// Everything hashed into the prefix hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPrefix {
    pub version: u64,
    pub unlock_time: u64,
    pub tx_type: TxType,
    pub amount_burnt: u64,
    pub source_asset_type: String,
    pub destination_asset_type: String,
    pub amount_slippage_limit: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub extra: Vec<u8>,
    pub extension: PrefixExtension,
}

/// Version/type-conditional prefix trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixExtension {
    None,
    /// v3+ TRANSFER: one blinded return point per output plus the
    /// change-index mask byte per output.
    ReturnAddressList {
        addresses: Vec<[u8; 32]>,
        change_mask: Vec<u8>,
    },
    /// v3 STAKE/AUDIT/BURN/CONVERT: plain return address pair.
    LegacyReturn {
        return_address: [u8; 32],
        return_pubkey: [u8; 32],
    },
    /// v4 STAKE/AUDIT: a full CARROT return enote for the protocol payout.
    Protocol(ProtocolTxData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolTxData {
    pub version: u64,
    pub return_address: [u8; 32],
    pub return_pubkey: [u8; 32],
    pub return_view_tag: [u8; 3],
    pub return_anchor_enc: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxInput {
    /// Coinbase (generation) input.
    Gen { height: u64 },
    /// Key input spending a prior output through a ring.
    Key {
        amount: u64,
        asset_type: String,
        /// Relative offsets into the global output index, ascending.
        key_offsets: Vec<u64>,
        key_image: [u8; 32],
    },
}

impl TxInput {
    pub fn key_image(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Key { key_image, .. } => Some(key_image),
            Self::Gen { .. } => None,
        }
    }

    pub fn ring_size(&self) -> usize {
        match self {
            Self::Key { key_offsets, .. } => key_offsets.len(),
            Self::Gen { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutput {
    /// Bare one-time key, pre view tags.
    Key {
        amount: u64,
        key: [u8; 32],
        asset_type: String,
    },
    /// One-time key with the 1-byte CryptoNote view tag.
    TaggedKey {
        amount: u64,
        key: [u8; 32],
        asset_type: String,
        view_tag: u8,
    },
    /// CARROT v1 enote: 3-byte view tag plus encrypted janus anchor.
    CarrotV1 {
        amount: u64,
        key: [u8; 32],
        asset_type: String,
        view_tag: [u8; 3],
        encrypted_anchor: [u8; 16],
    },
}

impl TxOutput {
    pub fn amount(&self) -> u64 {
        match self {
            Self::Key { amount, .. }
            | Self::TaggedKey { amount, .. }
            | Self::CarrotV1 { amount, .. } => *amount,
        }
    }

    pub fn key(&self) -> &[u8; 32] {
        match self {
            Self::Key { key, .. }
            | Self::TaggedKey { key, .. }
            | Self::CarrotV1 { key, .. } => key,
        }
    }

    pub fn asset_type(&self) -> &str {
        match self {
            Self::Key { asset_type, .. }
            | Self::TaggedKey { asset_type, .. }
            | Self::CarrotV1 { asset_type, .. } => asset_type,
        }
    }

    pub fn target(&self) -> OutputTarget {
        match self {
            Self::Key { .. } => OutputTarget::Key,
            Self::TaggedKey { .. } => OutputTarget::TaggedKey,
            Self::CarrotV1 { .. } => OutputTarget::CarrotV1,
        }
    }
}

// ─── RingCT signatures ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RctSignatures {
    pub rct_type: RctType,
    pub txn_fee: u64,
    /// Compact 8-byte encrypted amount per output.
    pub ecdh_info: Vec<[u8; 8]>,
    /// Output commitments.
    pub out_pk: Vec<[u8; 32]>,
    /// Mask-difference group element (identity when balanced exactly).
    pub p_r: [u8; 32],
    /// Present for rct types ≥ FullProofs.
    pub salvium_data: Option<SalviumData>,
    pub bulletproofs_plus: Vec<BpPlusData>,
    pub clsags: Vec<ClsagData>,
    pub tclsags: Vec<TclsagData>,
    pub pseudo_outs: Vec<[u8; 32]>,
}

/// Trailer carrying the `p_r` Schnorr proof and the reserved sa_proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalviumData {
    pub data_type: u64,
    pub pr_proof: ZkProof,
    pub sa_proof: ZkProof,
}

/// Three 32-byte words: R, z1, z2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZkProof {
    pub r: [u8; 32],
    pub z1: [u8; 32],
    pub z2: [u8; 32],
}

impl ZkProof {
    pub fn zeros() -> Self {
        Self {
            r: [0u8; 32],
            z1: [0u8; 32],
            z2: [0u8; 32],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClsagData {
    pub s: Vec<[u8; 32]>,
    pub c1: [u8; 32],
    /// ⅛-scaled commitment image.
    pub d: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TclsagData {
    pub sx: Vec<[u8; 32]>,
    pub sy: Vec<[u8; 32]>,
    pub c1: [u8; 32],
    pub d: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpPlusData {
    pub a: [u8; 32],
    pub a1: [u8; 32],
    pub b: [u8; 32],
    pub r1: [u8; 32],
    pub s1: [u8; 32],
    pub d1: [u8; 32],
    pub l: Vec<[u8; 32]>,
    pub r: Vec<[u8; 32]>,
}

// ─── Tx-extra tags ──────────────────────────────────────────────────────────

/// TLV tags inside the extra field.
pub mod extra_tag {
    pub const PADDING: u8 = 0x00;
    pub const TX_PUBKEY: u8 = 0x01;
    pub const NONCE: u8 = 0x02;
    pub const ADDITIONAL_PUBKEYS: u8 = 0x04;
    /// Reserved audit-disclosure payload: 64 bytes
    /// (view secret key ‖ spend public key).
    pub const AUDIT_DISCLOSURE: u8 = 0x05;
}

/// Append the tx public key entry (`0x01` + 32 bytes).
pub fn extra_push_tx_pubkey(extra: &mut Vec<u8>, pubkey: &[u8; 32]) {
    extra.push(extra_tag::TX_PUBKEY);
    extra.extend_from_slice(pubkey);
}

/// Append the audit-disclosure entry (`0x05` + 64 bytes).
pub fn extra_push_audit_disclosure(
    extra: &mut Vec<u8>,
    view_secret_key: &[u8; 32],
    spend_public_key: &[u8; 32],
) {
    extra.push(extra_tag::AUDIT_DISCLOSURE);
    extra.extend_from_slice(view_secret_key);
    extra.extend_from_slice(spend_public_key);
}

/// Extract the first tx public key from extra, if present.
pub fn extra_find_tx_pubkey(extra: &[u8]) -> Option<[u8; 32]> {
    walk_extra(extra, extra_tag::TX_PUBKEY, 32).map(|bytes| {
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        out
    })
}

/// Extract the audit-disclosure payload, if present.
pub fn extra_find_audit_disclosure(extra: &[u8]) -> Option<([u8; 32], [u8; 32])> {
    walk_extra(extra, extra_tag::AUDIT_DISCLOSURE, 64).map(|bytes| {
        let mut view = [0u8; 32];
        let mut spend = [0u8; 32];
        view.copy_from_slice(&bytes[..32]);
        spend.copy_from_slice(&bytes[32..]);
        (view, spend)
    })
}

/// Walk the TLV stream looking for `wanted` with a fixed payload size.
fn walk_extra(extra: &[u8], wanted: u8, wanted_len: usize) -> Option<&[u8]> {
    let mut pos = 0;
    while pos < extra.len() {
        let tag = extra[pos];
        pos += 1;
        let len = match tag {
            extra_tag::PADDING => 0,
            extra_tag::TX_PUBKEY => 32,
            extra_tag::AUDIT_DISCLOSURE => 64,
            extra_tag::NONCE | extra_tag::ADDITIONAL_PUBKEYS => {
                // length byte follows; additional pubkeys count keys
                let count = *extra.get(pos)? as usize;
                pos += 1;
                if tag == extra_tag::ADDITIONAL_PUBKEYS {
                    count * 32
                } else {
                    count
                }
            }
            _ => return None,
        };
        if pos + len > extra.len() {
            return None;
        }
        if tag == wanted && len == wanted_len {
            return Some(&extra[pos..pos + len]);
        }
        pos += len;
    }
    None
}
