//! Fee engine: structural size/weight estimation with the bulletproof
//! clawback, and the 2021 dynamic per-byte fee with priority multipliers.

use salvium_types::consensus::{fee_per_byte, fee_quantization_mask};
use salvium_types::{OutputTarget, DEFAULT_RING_SIZE};

/// Fee priority levels with their multipliers. Priority 0 maps to Normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePriority {
    Low,
    Normal,
    High,
    Highest,
}

impl FeePriority {
    pub fn multiplier(self) -> u64 {
        match self {
            FeePriority::Low => 1,
            FeePriority::Normal => 5,
            FeePriority::High => 25,
            FeePriority::Highest => 1000,
        }
    }

    pub fn from_level(level: u8) -> Self {
        match level {
            1 => FeePriority::Low,
            3 => FeePriority::High,
            4 => FeePriority::Highest,
            _ => FeePriority::Normal,
        }
    }
}

/// Estimated serialized size in bytes.
pub fn estimate_tx_size(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_type: OutputTarget,
) -> usize {
    let mut size = 0usize;
    // version + unlock_time + tx_type + amount_burnt + slippage varints,
    // two 8-byte asset fields, vin/vout counts.
    size += 5 * 2 + 16 + 2;

    // Inputs: tag + amount varint + asset(8) + offsets count + offsets + key image.
    size += num_inputs * (1 + 1 + 8 + 1 + ring_size * 4 + 32);

    // Outputs: amount varint + tag + key + asset(8) + target payload.
    let target_payload = match out_type {
        OutputTarget::CarrotV1 => 3 + 16,
        OutputTarget::TaggedKey => 1,
        OutputTarget::Key => 0,
    };
    size += num_outputs * (1 + 1 + 32 + 8 + target_payload);

    // Extra: tx pubkey plus slack for a nonce.
    size += 44;

    // Return-address trailer: one point and one mask byte per output.
    size += 1 + num_outputs * 33;

    // RCT base: type + fee varint + ecdh + outPk + p_r + salvium_data.
    size += 1 + 5 + num_outputs * (8 + 32) + 32 + 1 + 192;

    // Range proof.
    size += estimate_bp_plus_size(num_outputs);

    // Ring signatures.
    if use_tclsag {
        size += num_inputs * (ring_size * 64 + 64);
    } else {
        size += num_inputs * (ring_size * 32 + 64);
    }

    // Pseudo-outs.
    size += num_inputs * 32;

    size
}

/// Weight = size + clawback for aggregated range proofs over 2 outputs.
pub fn estimate_tx_weight(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_type: OutputTarget,
) -> u64 {
    let size = estimate_tx_size(num_inputs, num_outputs, ring_size, use_tclsag, out_type) as u64;
    size + bp_plus_clawback(num_outputs)
}

/// Estimated fee at the given fork/priority. `base_reward = 0` falls back
/// to the per-byte floor.
pub fn estimate_tx_fee(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_type: OutputTarget,
    base_reward: u64,
    hf_version: u8,
    priority: FeePriority,
) -> u64 {
    let weight = estimate_tx_weight(num_inputs, num_outputs, ring_size, use_tclsag, out_type);
    let per_byte = fee_per_byte(base_reward, hf_version) * priority.multiplier();
    let needed = weight * per_byte;
    let mask = fee_quantization_mask();
    ((needed + mask) / (mask + 1)) * (mask + 1)
}

/// Quick estimate for a current-era transaction at normal priority.
pub fn estimate_fee_simple(num_inputs: usize, num_outputs: usize, hf_version: u8) -> u64 {
    estimate_tx_fee(
        num_inputs,
        num_outputs,
        DEFAULT_RING_SIZE,
        true,
        OutputTarget::CarrotV1,
        0,
        hf_version,
        FeePriority::Normal,
    )
}

// ─── Internals ──────────────────────────────────────────────────────────────

/// 6 fixed scalars + 3 fixed points + 2·(6 + log₂ pad) L/R points.
fn estimate_bp_plus_size(num_outputs: usize) -> usize {
    if num_outputs == 0 {
        return 0;
    }
    let lr = 2 * (6 + log2_ceil(num_outputs));
    32 * (6 + 3 + lr)
}

/// Aggregated proofs grow logarithmically; the clawback charges back 4/5
/// of the bytes saved versus per-2-output proofs so large aggregations do
/// not get an artificial fee discount.
pub fn bp_plus_clawback(num_outputs: usize) -> u64 {
    if num_outputs <= 2 {
        return 0;
    }
    let bp_base: u64 = 32 * (6 + 14) / 2;
    let pad = 1u64 << log2_ceil(num_outputs);
    let bp_size: u64 = 32 * (6 + 2 * (6 + log2_ceil(num_outputs) as u64));
    (bp_base * pad).saturating_sub(bp_size) * 4 / 5
}

fn log2_ceil(n: usize) -> usize {
    let mut log = 0;
    let mut v = 1usize;
    while v < n {
        v <<= 1;
        log += 1;
    }
    log
}
