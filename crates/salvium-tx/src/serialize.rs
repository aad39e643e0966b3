//! Binary wire format: varints, prefix, rct-base, rct-prunable.
//!
//! Layout (prefix):
//!   1. varint version
//!   2. varint unlock_time
//!   3. version ≥ 3: varint tx_type, varint amount_burnt,
//!      8-byte source asset, 8-byte destination asset, varint slippage
//!   4. vin (count + entries)
//!   5. vout (count + entries)
//!   6. extra (length + bytes)
//!   7. the version/type-conditional trailer (`PrefixExtension`)
//!
//! Pseudo-outs at the end of the prunable section are bare 32-byte points;
//! their count is implied by the input count.

use salvium_types::{OutputTarget, RctType, TxType, TXIN_GEN, TXIN_KEY};

use crate::types::*;
use crate::TxError;

// ─── Varint ─────────────────────────────────────────────────────────────────

/// Little-endian varint, 7 data bits per byte, high bit = continuation.
pub fn write_varint(buf: &mut Vec<u8>, mut v: u64) {
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

pub fn varint_len(v: u64) -> usize {
    let mut len = 1;
    let mut v = v >> 7;
    while v > 0 {
        len += 1;
        v >>= 7;
    }
    len
}

// ─── Reader ─────────────────────────────────────────────────────────────────

pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_varint(&mut self) -> Result<u64, TxError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or_else(|| TxError::Parse("varint past end".into()))?;
            self.pos += 1;
            if shift >= 64 {
                return Err(TxError::Parse("varint overflow".into()));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, TxError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| TxError::Parse("byte past end".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        if self.pos + N > self.data.len() {
            return Err(TxError::Parse(format!("{N} bytes past end")));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, TxError> {
        if self.pos + len > self.data.len() {
            return Err(TxError::Parse(format!("{len} bytes past end")));
        }
        let out = self.data[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(out)
    }
}

// ─── Asset types: fixed 8-byte, zero padded ─────────────────────────────────

fn write_asset(buf: &mut Vec<u8>, asset: &str) -> Result<(), TxError> {
    let bytes = asset.as_bytes();
    if bytes.len() > 8 {
        return Err(TxError::Serialize(format!("asset type too long: {asset}")));
    }
    let mut field = [0u8; 8];
    field[..bytes.len()].copy_from_slice(bytes);
    buf.extend_from_slice(&field);
    Ok(())
}

fn read_asset(r: &mut Reader) -> Result<String, TxError> {
    let field: [u8; 8] = r.read_bytes()?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(8);
    String::from_utf8(field[..end].to_vec())
        .map_err(|_| TxError::Parse("non-utf8 asset type".into()))
}

// ─── Prefix ─────────────────────────────────────────────────────────────────

pub fn serialize_prefix(prefix: &TxPrefix) -> Result<Vec<u8>, TxError> {
    let mut buf = Vec::with_capacity(2048);
    write_varint(&mut buf, prefix.version);
    write_varint(&mut buf, prefix.unlock_time);

    if prefix.version >= 3 {
        write_varint(&mut buf, prefix.tx_type as u64);
        write_varint(&mut buf, prefix.amount_burnt);
        write_asset(&mut buf, &prefix.source_asset_type)?;
        write_asset(&mut buf, &prefix.destination_asset_type)?;
        write_varint(&mut buf, prefix.amount_slippage_limit);
    }

    write_varint(&mut buf, prefix.inputs.len() as u64);
    for input in &prefix.inputs {
        match input {
            TxInput::Gen { height } => {
                buf.push(TXIN_GEN);
                write_varint(&mut buf, *height);
            }
            TxInput::Key {
                amount,
                asset_type,
                key_offsets,
                key_image,
            } => {
                buf.push(TXIN_KEY);
                write_varint(&mut buf, *amount);
                write_asset(&mut buf, asset_type)?;
                write_varint(&mut buf, key_offsets.len() as u64);
                for off in key_offsets {
                    write_varint(&mut buf, *off);
                }
                buf.extend_from_slice(key_image);
            }
        }
    }

    write_varint(&mut buf, prefix.outputs.len() as u64);
    for output in &prefix.outputs {
        write_varint(&mut buf, output.amount());
        buf.push(output.target() as u8);
        buf.extend_from_slice(output.key());
        write_asset(&mut buf, output.asset_type())?;
        match output {
            TxOutput::Key { .. } => {}
            TxOutput::TaggedKey { view_tag, .. } => buf.push(*view_tag),
            TxOutput::CarrotV1 {
                view_tag,
                encrypted_anchor,
                ..
            } => {
                buf.extend_from_slice(view_tag);
                buf.extend_from_slice(encrypted_anchor);
            }
        }
    }

    write_varint(&mut buf, prefix.extra.len() as u64);
    buf.extend_from_slice(&prefix.extra);

    serialize_extension(&mut buf, prefix)?;
    Ok(buf)
}

/// Which trailer a (version, tx_type) pair carries on the wire.
fn expected_extension(version: u64, tx_type: TxType) -> ExtensionKind {
    if version < 3 || tx_type.is_coinbase() || tx_type == TxType::Unset {
        return ExtensionKind::None;
    }
    match tx_type {
        TxType::Transfer => ExtensionKind::ReturnAddressList,
        TxType::Stake | TxType::Audit if version >= 4 => ExtensionKind::Protocol,
        _ => ExtensionKind::LegacyReturn,
    }
}

#[derive(PartialEq, Eq, Debug)]
enum ExtensionKind {
    None,
    ReturnAddressList,
    LegacyReturn,
    Protocol,
}

fn serialize_extension(buf: &mut Vec<u8>, prefix: &TxPrefix) -> Result<(), TxError> {
    let expected = expected_extension(prefix.version, prefix.tx_type);
    match (&prefix.extension, expected) {
        (PrefixExtension::None, ExtensionKind::None) => Ok(()),
        (
            PrefixExtension::ReturnAddressList {
                addresses,
                change_mask,
            },
            ExtensionKind::ReturnAddressList,
        ) => {
            write_varint(buf, addresses.len() as u64);
            for addr in addresses {
                buf.extend_from_slice(addr);
            }
            write_varint(buf, change_mask.len() as u64);
            buf.extend_from_slice(change_mask);
            Ok(())
        }
        (
            PrefixExtension::LegacyReturn {
                return_address,
                return_pubkey,
            },
            ExtensionKind::LegacyReturn,
        ) => {
            buf.extend_from_slice(return_address);
            buf.extend_from_slice(return_pubkey);
            Ok(())
        }
        (PrefixExtension::Protocol(ptd), ExtensionKind::Protocol) => {
            write_varint(buf, ptd.version);
            buf.extend_from_slice(&ptd.return_address);
            buf.extend_from_slice(&ptd.return_pubkey);
            buf.extend_from_slice(&ptd.return_view_tag);
            buf.extend_from_slice(&ptd.return_anchor_enc);
            Ok(())
        }
        (ext, expected) => Err(TxError::Serialize(format!(
            "extension {ext:?} does not fit tx type {} v{} (wire wants {expected:?})",
            prefix.tx_type, prefix.version
        ))),
    }
}

pub fn parse_prefix(r: &mut Reader) -> Result<TxPrefix, TxError> {
    let version = r.read_varint()?;
    let unlock_time = r.read_varint()?;

    let (tx_type, amount_burnt, source_asset_type, destination_asset_type, amount_slippage_limit) =
        if version >= 3 {
            let raw_type = r.read_varint()?;
            let tx_type = TxType::from_u8(raw_type as u8)
                .ok_or_else(|| TxError::Parse(format!("unknown tx type {raw_type}")))?;
            let burnt = r.read_varint()?;
            let src = read_asset(r)?;
            let dst = read_asset(r)?;
            let slip = r.read_varint()?;
            (tx_type, burnt, src, dst, slip)
        } else {
            (TxType::Transfer, 0, "SAL".to_string(), "SAL".to_string(), 0)
        };

    let vin_count = r.read_varint()? as usize;
    let mut inputs = Vec::with_capacity(vin_count.min(1024));
    for _ in 0..vin_count {
        let tag = r.read_u8()?;
        match tag {
            TXIN_GEN => inputs.push(TxInput::Gen {
                height: r.read_varint()?,
            }),
            TXIN_KEY => {
                let amount = r.read_varint()?;
                let asset_type = read_asset(r)?;
                let offset_count = r.read_varint()? as usize;
                let mut key_offsets = Vec::with_capacity(offset_count.min(1024));
                for _ in 0..offset_count {
                    key_offsets.push(r.read_varint()?);
                }
                inputs.push(TxInput::Key {
                    amount,
                    asset_type,
                    key_offsets,
                    key_image: r.read_bytes()?,
                });
            }
            _ => return Err(TxError::Parse(format!("unknown input tag {tag:#x}"))),
        }
    }

    let vout_count = r.read_varint()? as usize;
    let mut outputs = Vec::with_capacity(vout_count.min(1024));
    for _ in 0..vout_count {
        let amount = r.read_varint()?;
        let tag = r.read_u8()?;
        let target = OutputTarget::from_u8(tag)
            .ok_or_else(|| TxError::Parse(format!("unknown output tag {tag:#x}")))?;
        let key: [u8; 32] = r.read_bytes()?;
        let asset_type = read_asset(r)?;
        outputs.push(match target {
            OutputTarget::Key => TxOutput::Key {
                amount,
                key,
                asset_type,
            },
            OutputTarget::TaggedKey => TxOutput::TaggedKey {
                amount,
                key,
                asset_type,
                view_tag: r.read_u8()?,
            },
            OutputTarget::CarrotV1 => TxOutput::CarrotV1 {
                amount,
                key,
                asset_type,
                view_tag: r.read_bytes()?,
                encrypted_anchor: r.read_bytes()?,
            },
        });
    }

    let extra_len = r.read_varint()? as usize;
    let extra = r.read_vec(extra_len)?;

    let extension = match expected_extension(version, tx_type) {
        ExtensionKind::None => PrefixExtension::None,
        ExtensionKind::ReturnAddressList => {
            let count = r.read_varint()? as usize;
            let mut addresses = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                addresses.push(r.read_bytes()?);
            }
            let mask_len = r.read_varint()? as usize;
            PrefixExtension::ReturnAddressList {
                addresses,
                change_mask: r.read_vec(mask_len)?,
            }
        }
        ExtensionKind::LegacyReturn => PrefixExtension::LegacyReturn {
            return_address: r.read_bytes()?,
            return_pubkey: r.read_bytes()?,
        },
        ExtensionKind::Protocol => PrefixExtension::Protocol(ProtocolTxData {
            version: r.read_varint()?,
            return_address: r.read_bytes()?,
            return_pubkey: r.read_bytes()?,
            return_view_tag: r.read_bytes()?,
            return_anchor_enc: r.read_bytes()?,
        }),
    };

    Ok(TxPrefix {
        version,
        unlock_time,
        tx_type,
        amount_burnt,
        source_asset_type,
        destination_asset_type,
        amount_slippage_limit,
        inputs,
        outputs,
        extra,
        extension,
    })
}

// ─── RCT base ───────────────────────────────────────────────────────────────

pub fn serialize_rct_base(rct: &RctSignatures) -> Vec<u8> {
    let mut buf =
        Vec::with_capacity(64 + rct.ecdh_info.len() * 8 + rct.out_pk.len() * 32 + 224);
    buf.push(rct.rct_type as u8);
    if rct.rct_type == RctType::Null {
        return buf;
    }
    write_varint(&mut buf, rct.txn_fee);
    for ecdh in &rct.ecdh_info {
        buf.extend_from_slice(ecdh);
    }
    for pk in &rct.out_pk {
        buf.extend_from_slice(pk);
    }
    buf.extend_from_slice(&rct.p_r);
    if rct.rct_type.has_salvium_data() {
        let sd = rct.salvium_data.clone().unwrap_or(SalviumData {
            data_type: 0,
            pr_proof: ZkProof::zeros(),
            sa_proof: ZkProof::zeros(),
        });
        write_varint(&mut buf, sd.data_type);
        write_zk_proof(&mut buf, &sd.pr_proof);
        write_zk_proof(&mut buf, &sd.sa_proof);
    }
    buf
}

fn write_zk_proof(buf: &mut Vec<u8>, proof: &ZkProof) {
    buf.extend_from_slice(&proof.r);
    buf.extend_from_slice(&proof.z1);
    buf.extend_from_slice(&proof.z2);
}

fn read_zk_proof(r: &mut Reader) -> Result<ZkProof, TxError> {
    Ok(ZkProof {
        r: r.read_bytes()?,
        z1: r.read_bytes()?,
        z2: r.read_bytes()?,
    })
}

fn parse_rct_base(r: &mut Reader, num_outputs: usize) -> Result<RctSignatures, TxError> {
    let raw = r.read_u8()?;
    let rct_type =
        RctType::from_u8(raw).ok_or_else(|| TxError::Parse(format!("unknown rct type {raw}")))?;
    if rct_type == RctType::Null {
        return Ok(RctSignatures {
            rct_type,
            txn_fee: 0,
            ecdh_info: Vec::new(),
            out_pk: Vec::new(),
            p_r: [0u8; 32],
            salvium_data: None,
            bulletproofs_plus: Vec::new(),
            clsags: Vec::new(),
            tclsags: Vec::new(),
            pseudo_outs: Vec::new(),
        });
    }

    let txn_fee = r.read_varint()?;
    let mut ecdh_info = Vec::with_capacity(num_outputs);
    for _ in 0..num_outputs {
        ecdh_info.push(r.read_bytes()?);
    }
    let mut out_pk = Vec::with_capacity(num_outputs);
    for _ in 0..num_outputs {
        out_pk.push(r.read_bytes()?);
    }
    let p_r: [u8; 32] = r.read_bytes()?;

    let salvium_data = if rct_type.has_salvium_data() {
        Some(SalviumData {
            data_type: r.read_varint()?,
            pr_proof: read_zk_proof(r)?,
            sa_proof: read_zk_proof(r)?,
        })
    } else {
        None
    };

    Ok(RctSignatures {
        rct_type,
        txn_fee,
        ecdh_info,
        out_pk,
        p_r,
        salvium_data,
        bulletproofs_plus: Vec::new(),
        clsags: Vec::new(),
        tclsags: Vec::new(),
        pseudo_outs: Vec::new(),
    })
}

// ─── RCT prunable ───────────────────────────────────────────────────────────

pub fn serialize_rct_prunable(rct: &RctSignatures) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4096);
    if rct.rct_type == RctType::Null {
        return buf;
    }

    write_varint(&mut buf, rct.bulletproofs_plus.len() as u64);
    for bp in &rct.bulletproofs_plus {
        buf.extend_from_slice(&bp.a);
        buf.extend_from_slice(&bp.a1);
        buf.extend_from_slice(&bp.b);
        buf.extend_from_slice(&bp.r1);
        buf.extend_from_slice(&bp.s1);
        buf.extend_from_slice(&bp.d1);
        write_varint(&mut buf, bp.l.len() as u64);
        for l in &bp.l {
            buf.extend_from_slice(l);
        }
        for r in &bp.r {
            buf.extend_from_slice(r);
        }
    }

    if rct.rct_type.uses_tclsag() {
        for sig in &rct.tclsags {
            for s in &sig.sx {
                buf.extend_from_slice(s);
            }
            for s in &sig.sy {
                buf.extend_from_slice(s);
            }
            buf.extend_from_slice(&sig.c1);
            buf.extend_from_slice(&sig.d);
        }
    } else {
        for sig in &rct.clsags {
            for s in &sig.s {
                buf.extend_from_slice(s);
            }
            buf.extend_from_slice(&sig.c1);
            buf.extend_from_slice(&sig.d);
        }
    }

    for po in &rct.pseudo_outs {
        buf.extend_from_slice(po);
    }
    buf
}

fn parse_rct_prunable(
    r: &mut Reader,
    rct: &mut RctSignatures,
    ring_sizes: &[usize],
) -> Result<(), TxError> {
    let bp_count = r.read_varint()? as usize;
    for _ in 0..bp_count {
        let a = r.read_bytes()?;
        let a1 = r.read_bytes()?;
        let b = r.read_bytes()?;
        let r1 = r.read_bytes()?;
        let s1 = r.read_bytes()?;
        let d1 = r.read_bytes()?;
        let l_count = r.read_varint()? as usize;
        if l_count > 16 {
            return Err(TxError::Parse(format!("implausible L count {l_count}")));
        }
        let mut l = Vec::with_capacity(l_count);
        for _ in 0..l_count {
            l.push(r.read_bytes()?);
        }
        let mut rr = Vec::with_capacity(l_count);
        for _ in 0..l_count {
            rr.push(r.read_bytes()?);
        }
        rct.bulletproofs_plus.push(BpPlusData {
            a,
            a1,
            b,
            r1,
            s1,
            d1,
            l,
            r: rr,
        });
    }

    for &ring_size in ring_sizes {
        if rct.rct_type.uses_tclsag() {
            let mut sx = Vec::with_capacity(ring_size);
            for _ in 0..ring_size {
                sx.push(r.read_bytes()?);
            }
            let mut sy = Vec::with_capacity(ring_size);
            for _ in 0..ring_size {
                sy.push(r.read_bytes()?);
            }
            rct.tclsags.push(TclsagData {
                sx,
                sy,
                c1: r.read_bytes()?,
                d: r.read_bytes()?,
            });
        } else {
            let mut s = Vec::with_capacity(ring_size);
            for _ in 0..ring_size {
                s.push(r.read_bytes()?);
            }
            rct.clsags.push(ClsagData {
                s,
                c1: r.read_bytes()?,
                d: r.read_bytes()?,
            });
        }
    }

    for _ in 0..ring_sizes.len() {
        rct.pseudo_outs.push(r.read_bytes()?);
    }
    Ok(())
}

// ─── Whole transaction ──────────────────────────────────────────────────────

pub fn serialize_transaction(tx: &Transaction) -> Result<Vec<u8>, TxError> {
    let mut buf = serialize_prefix(&tx.prefix)?;
    if let Some(rct) = &tx.rct {
        buf.extend_from_slice(&serialize_rct_base(rct));
        if rct.rct_type != RctType::Null {
            buf.extend_from_slice(&serialize_rct_prunable(rct));
        }
    }
    Ok(buf)
}

pub fn parse_transaction(bytes: &[u8]) -> Result<Transaction, TxError> {
    let mut r = Reader::new(bytes);
    let prefix = parse_prefix(&mut r)?;

    if r.remaining() == 0 {
        return Ok(Transaction { prefix, rct: None });
    }

    let mut rct = parse_rct_base(&mut r, prefix.outputs.len())?;
    if rct.rct_type != RctType::Null {
        let ring_sizes: Vec<usize> = prefix.inputs.iter().map(|i| i.ring_size()).collect();
        parse_rct_prunable(&mut r, &mut rct, &ring_sizes)?;
    }
    if r.remaining() != 0 {
        return Err(TxError::Parse(format!(
            "{} trailing bytes after transaction",
            r.remaining()
        )));
    }
    Ok(Transaction {
        prefix,
        rct: Some(rct),
    })
}
