//! Per-transaction consensus arithmetic: fees, weight caps, and the
//! fork-version mapping for transaction/RCT formats.
//!
//! Reference: cryptonote_config.h and blockchain.cpp fee logic.

use crate::constants::{HfVersion, Network, TxType, TRANSACTION_VERSION_2_OUTS,
    TRANSACTION_VERSION_CARROT, TRANSACTION_VERSION_N_OUTS};
use crate::constants::RctType;

// =============================================================================
// Fee Constants
// =============================================================================

/// Floor fee per byte.
pub const FEE_PER_BYTE: u64 = 30;

/// Base for the 2021 dynamic per-byte fee: base_fee = this / 1024.
pub const DYNAMIC_FEE_PER_KB_BASE_FEE: u64 = 200_000;

/// Reference block reward the dynamic fee is normalized against.
pub const DYNAMIC_FEE_PER_KB_BASE_BLOCK_REWARD: u64 = 1_000_000_000;

/// Fees are rounded up to a multiple of 10^this.
pub const PER_KB_FEE_QUANTIZATION_DECIMALS: u32 = 8;

/// Validator tolerance: a fee may undershoot the requirement by 1/this.
pub const FEE_TOLERANCE_DIVISOR: u64 = 50;

// =============================================================================
// Block Weight
// =============================================================================

/// Full-reward-zone block weights per fork era.
pub const BLOCK_GRANTED_FULL_REWARD_ZONE_V1: u64 = 20_000;
pub const BLOCK_GRANTED_FULL_REWARD_ZONE_V2: u64 = 60_000;
pub const BLOCK_GRANTED_FULL_REWARD_ZONE_V5: u64 = 300_000;

/// Bytes reserved in every block for the coinbase blob.
pub const COINBASE_BLOB_RESERVED_SIZE: u64 = 600;

/// Minimum block weight granted full reward at a fork version.
pub fn min_block_weight(hf_version: u8) -> u64 {
    if hf_version >= 5 {
        BLOCK_GRANTED_FULL_REWARD_ZONE_V5
    } else if hf_version >= 2 {
        BLOCK_GRANTED_FULL_REWARD_ZONE_V2
    } else {
        BLOCK_GRANTED_FULL_REWARD_ZONE_V1
    }
}

/// Maximum weight of a single transaction at a fork version.
pub fn max_tx_weight(hf_version: u8) -> u64 {
    let min_weight = min_block_weight(hf_version);
    if hf_version >= 2 {
        min_weight / 2 - COINBASE_BLOB_RESERVED_SIZE
    } else {
        min_weight - COINBASE_BLOB_RESERVED_SIZE
    }
}

// =============================================================================
// Fee Calculation (2021 scaling)
// =============================================================================

/// The quantization mask: required fees round up to `mask + 1` multiples.
pub fn fee_quantization_mask() -> u64 {
    10u64.pow(PER_KB_FEE_QUANTIZATION_DECIMALS) - 1
}

/// Dynamic per-byte fee at a fork version, given the current block reward.
pub fn fee_per_byte(base_reward: u64, hf_version: u8) -> u64 {
    if hf_version >= HfVersion::SCALING_2021 {
        let base_fee = DYNAMIC_FEE_PER_KB_BASE_FEE / 1024;
        if base_reward > 0 {
            let f = (base_fee * DYNAMIC_FEE_PER_KB_BASE_BLOCK_REWARD) / base_reward;
            f.max(FEE_PER_BYTE)
        } else {
            FEE_PER_BYTE
        }
    } else {
        FEE_PER_BYTE
    }
}

/// Required fee for a transaction of the given weight, quantized upward.
pub fn calculate_required_fee(tx_weight: u64, base_reward: u64, hf_version: u8) -> u64 {
    let needed = tx_weight * fee_per_byte(base_reward, hf_version);
    let mask = fee_quantization_mask();
    ((needed + mask) / (mask + 1)) * (mask + 1)
}

// =============================================================================
// Fork Mapping
// =============================================================================

/// Hard-fork activation heights per network: (version, first height).
fn hard_fork_heights(network: Network) -> &'static [(u8, u64)] {
    match network {
        Network::Mainnet => &[
            (1, 0),
            (2, 89_300),
            (3, 187_000),
            (4, 243_500),
            (5, 330_000),
            (6, 385_000),
            (7, 441_000),
            (8, 495_000),
            (9, 551_000),
            (10, 608_000),
        ],
        Network::Testnet => &[
            (1, 0),
            (2, 10),
            (3, 20),
            (4, 30),
            (5, 40),
            (6, 50),
            (7, 60),
            (8, 70),
            (9, 80),
            (10, 90),
        ],
        Network::Stagenet => &[(1, 0), (2, 100), (4, 200), (6, 300), (10, 400)],
    }
}

/// Hard-fork version active at a height.
pub fn hf_version_for_height(height: u64, network: Network) -> u8 {
    let mut version = 1;
    for &(v, activation) in hard_fork_heights(network) {
        if height >= activation {
            version = v;
        }
    }
    version
}

/// RCT signature type mandated for user transactions at a fork version.
pub fn rct_type_for_hf(hf_version: u8) -> RctType {
    if hf_version >= HfVersion::CARROT {
        RctType::SalviumOne
    } else if hf_version >= HfVersion::SALVIUM_ONE_PROOFS {
        RctType::SalviumZero
    } else if hf_version >= HfVersion::ENFORCE_FULL_PROOFS {
        RctType::FullProofs
    } else {
        RctType::BulletproofPlus
    }
}

/// Transaction version mandated at a fork version.
pub fn tx_version_for_hf(hf_version: u8) -> u8 {
    if hf_version >= HfVersion::CARROT {
        TRANSACTION_VERSION_CARROT
    } else if hf_version >= HfVersion::ENABLE_N_OUTS {
        TRANSACTION_VERSION_N_OUTS
    } else {
        TRANSACTION_VERSION_2_OUTS
    }
}

/// Whether a (tx_type, version) pair is acceptable at a fork version.
/// At the CARROT fork, everything except TRANSFER/MINER/PROTOCOL must be v4.
pub fn tx_version_allowed(tx_type: TxType, version: u8, hf_version: u8) -> bool {
    if hf_version < HfVersion::ENABLE_N_OUTS {
        return version == TRANSACTION_VERSION_2_OUTS;
    }
    if hf_version >= HfVersion::CARROT
        && !matches!(tx_type, TxType::Transfer | TxType::Miner | TxType::Protocol)
    {
        return version == TRANSACTION_VERSION_CARROT;
    }
    version >= TRANSACTION_VERSION_2_OUTS && version <= TRANSACTION_VERSION_CARROT
}

// =============================================================================
// Staking
// =============================================================================

/// Blocks a stake stays locked before the protocol return pays out.
pub fn stake_lock_period(network: Network) -> u64 {
    match network {
        Network::Mainnet => 21_600,
        Network::Testnet => 20,
        Network::Stagenet => 100,
    }
}

/// Blacklisted transaction hashes (hex), rejected unconditionally.
pub const TX_BLACKLIST: &[&str] = &[
    "017a79539e69ce16e91d9aa2267c102f336678c41636567c1129e3e72149499a",
];

pub fn is_tx_blacklisted(tx_hash_hex: &str) -> bool {
    TX_BLACKLIST.contains(&tx_hash_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_mask() {
        assert_eq!(fee_quantization_mask(), 99_999_999);
    }

    #[test]
    fn required_fee_quantized_up() {
        let fee = calculate_required_fee(3000, 0, 2);
        assert_eq!(fee % 100_000_000, 0);
        assert!(fee >= 3000 * FEE_PER_BYTE);
    }

    #[test]
    fn dynamic_fee_scales_with_reward() {
        // Half the reference reward doubles the per-byte fee.
        let f_ref = fee_per_byte(DYNAMIC_FEE_PER_KB_BASE_BLOCK_REWARD, 2);
        let f_half = fee_per_byte(DYNAMIC_FEE_PER_KB_BASE_BLOCK_REWARD / 2, 2);
        assert_eq!(f_half, f_ref * 2);
        // Pre-2021 fork: flat.
        assert_eq!(fee_per_byte(1, 1), FEE_PER_BYTE);
    }

    #[test]
    fn fee_floor_applies() {
        // Huge reward drives the dynamic term below the floor.
        assert_eq!(fee_per_byte(u64::MAX / 2, 2), FEE_PER_BYTE);
    }

    #[test]
    fn rct_type_ladder() {
        assert_eq!(rct_type_for_hf(1), RctType::BulletproofPlus);
        assert_eq!(rct_type_for_hf(4), RctType::FullProofs);
        assert_eq!(rct_type_for_hf(6), RctType::SalviumZero);
        assert_eq!(rct_type_for_hf(10), RctType::SalviumOne);
    }

    #[test]
    fn tx_version_ladder() {
        assert_eq!(tx_version_for_hf(1), 2);
        assert_eq!(tx_version_for_hf(2), 3);
        assert_eq!(tx_version_for_hf(10), 4);
    }

    #[test]
    fn carrot_forces_v4_for_special_types() {
        assert!(tx_version_allowed(TxType::Stake, 4, HfVersion::CARROT));
        assert!(!tx_version_allowed(TxType::Stake, 2, HfVersion::CARROT));
        assert!(tx_version_allowed(TxType::Transfer, 3, HfVersion::CARROT));
    }

    #[test]
    fn max_weight_halves_after_v2() {
        assert_eq!(max_tx_weight(2), 60_000 / 2 - 600);
        assert_eq!(max_tx_weight(5), 300_000 / 2 - 600);
    }

    #[test]
    fn hf_for_height_monotonic() {
        assert_eq!(hf_version_for_height(0, Network::Mainnet), 1);
        assert_eq!(hf_version_for_height(89_300, Network::Mainnet), 2);
        assert_eq!(hf_version_for_height(700_000, Network::Mainnet), 10);
        assert_eq!(hf_version_for_height(95, Network::Testnet), 10);
    }

    #[test]
    fn blacklist_lookup() {
        assert!(is_tx_blacklisted(
            "017a79539e69ce16e91d9aa2267c102f336678c41636567c1129e3e72149499a"
        ));
        assert!(!is_tx_blacklisted("00"));
    }
}
