//! On-chain discriminants and network parameters.
//!
//! Values mirror the C++ definitions in cryptonote_basic.h / rctTypes.h /
//! cryptonote_config.h; nothing here may drift from the wire format.

use serde::{Deserialize, Serialize};

// =============================================================================
// Networks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Stagenet,
}

// =============================================================================
// Transaction Types
// =============================================================================

/// Salvium transaction type, stored as a varint in the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxType {
    Unset = 0,
    Miner = 1,
    Protocol = 2,
    Transfer = 3,
    Convert = 4,
    Burn = 5,
    Stake = 6,
    Return = 7,
    Audit = 8,
}

impl TxType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Unset),
            1 => Some(Self::Miner),
            2 => Some(Self::Protocol),
            3 => Some(Self::Transfer),
            4 => Some(Self::Convert),
            5 => Some(Self::Burn),
            6 => Some(Self::Stake),
            7 => Some(Self::Return),
            8 => Some(Self::Audit),
            _ => None,
        }
    }

    /// MINER and PROTOCOL transactions are coinbase-like: single gen input,
    /// RctType::Null, no ring signatures.
    pub fn is_coinbase(self) -> bool {
        matches!(self, Self::Miner | Self::Protocol)
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unset => "UNSET",
            Self::Miner => "MINER",
            Self::Protocol => "PROTOCOL",
            Self::Transfer => "TRANSFER",
            Self::Convert => "CONVERT",
            Self::Burn => "BURN",
            Self::Stake => "STAKE",
            Self::Return => "RETURN",
            Self::Audit => "AUDIT",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// RingCT Types
// =============================================================================

/// RingCT signature family carried in the rct-base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum RctType {
    Null = 0,
    Full = 1,
    Simple = 2,
    Bulletproof = 3,
    Bulletproof2 = 4,
    Clsag = 5,
    BulletproofPlus = 6,
    FullProofs = 7,
    SalviumZero = 8,
    SalviumOne = 9,
}

impl RctType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Null),
            1 => Some(Self::Full),
            2 => Some(Self::Simple),
            3 => Some(Self::Bulletproof),
            4 => Some(Self::Bulletproof2),
            5 => Some(Self::Clsag),
            6 => Some(Self::BulletproofPlus),
            7 => Some(Self::FullProofs),
            8 => Some(Self::SalviumZero),
            9 => Some(Self::SalviumOne),
            _ => None,
        }
    }

    /// SalviumOne transactions sign inputs with TCLSAG; everything from
    /// Clsag up to SalviumZero uses CLSAG.
    pub fn uses_tclsag(self) -> bool {
        self == Self::SalviumOne
    }

    /// Types that carry the salvium_data trailer (pr_proof + sa_proof).
    pub fn has_salvium_data(self) -> bool {
        matches!(self, Self::FullProofs | Self::SalviumZero | Self::SalviumOne)
    }
}

// =============================================================================
// Output Targets and Input Tags
// =============================================================================

/// Output target discriminant (1-byte tag in vout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OutputTarget {
    Key = 0x02,
    TaggedKey = 0x03,
    CarrotV1 = 0x04,
}

impl OutputTarget {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x02 => Some(Self::Key),
            0x03 => Some(Self::TaggedKey),
            0x04 => Some(Self::CarrotV1),
            _ => None,
        }
    }
}

/// Input type tags.
pub const TXIN_GEN: u8 = 0xff;
pub const TXIN_KEY: u8 = 0x02;

// =============================================================================
// Transaction Versions
// =============================================================================

/// Fixed 2-output transactions (pre n-outs fork).
pub const TRANSACTION_VERSION_2_OUTS: u8 = 2;
/// N-output transactions with the Salvium prefix trailer.
pub const TRANSACTION_VERSION_N_OUTS: u8 = 3;
/// CARROT-era transactions.
pub const TRANSACTION_VERSION_CARROT: u8 = 4;

// =============================================================================
// Asset Types
// =============================================================================

/// Chain-level asset identifier, serialized as a fixed 8-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Sal,
    Vsd,
    Burn,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sal => "SAL",
            Self::Vsd => "VSD",
            Self::Burn => "BURN",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "SAL" => Some(Self::Sal),
            "VSD" => Some(Self::Vsd),
            "BURN" => Some(Self::Burn),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Hard Fork Schedule
// =============================================================================

/// Named hard-fork versions. The numbers are protocol versions, not heights;
/// `consensus::hf_version_for_height` maps a chain position onto them.
pub struct HfVersion;

impl HfVersion {
    pub const REJECT_SIGS_IN_COINBASE: u8 = 1;
    pub const BULLETPROOF_PLUS: u8 = 1;
    pub const SCALING_2021: u8 = 2;
    pub const ENABLE_N_OUTS: u8 = 2;
    pub const ENFORCE_FULL_PROOFS: u8 = 4;
    pub const SALVIUM_ONE_PROOFS: u8 = 6;
    pub const CARROT: u8 = 10;
    pub const ENABLE_CONVERT: u8 = 255;
}

/// AUDIT transactions are only accepted during designated audit forks.
pub fn is_audit_hf(hf_version: u8) -> bool {
    matches!(hf_version, 6 | 8)
}

// =============================================================================
// Ring and Proof Limits
// =============================================================================

/// Mandatory ring size from the fixed-ring fork onward (15 decoys + real).
pub const DEFAULT_RING_SIZE: usize = 16;

/// Ring size used by pre-fixed-ring transactions.
pub const LEGACY_RING_SIZE: usize = 11;

/// Maximum outputs covered by one aggregated Bulletproofs+ proof.
pub const BULLETPROOF_MAX_OUTPUTS: usize = 16;

/// Range-proof bit width.
pub const AMOUNT_BITS: usize = 64;

// =============================================================================
// Timing
// =============================================================================

/// Target seconds between blocks.
pub const DIFFICULTY_TARGET: u64 = 120;

/// Blocks a fresh output stays unspendable.
pub const DEFAULT_TX_SPENDABLE_AGE: u64 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_round_trip() {
        for v in 0..=8u8 {
            let t = TxType::from_u8(v).unwrap();
            assert_eq!(t as u8, v);
        }
        assert!(TxType::from_u8(9).is_none());
    }

    #[test]
    fn rct_type_round_trip() {
        for v in 0..=9u8 {
            let t = RctType::from_u8(v).unwrap();
            assert_eq!(t as u8, v);
        }
        assert!(RctType::from_u8(10).is_none());
    }

    #[test]
    fn tclsag_only_for_salvium_one() {
        assert!(RctType::SalviumOne.uses_tclsag());
        assert!(!RctType::SalviumZero.uses_tclsag());
        assert!(!RctType::Clsag.uses_tclsag());
    }

    #[test]
    fn coinbase_types() {
        assert!(TxType::Miner.is_coinbase());
        assert!(TxType::Protocol.is_coinbase());
        assert!(!TxType::Transfer.is_coinbase());
    }

    #[test]
    fn audit_forks() {
        assert!(is_audit_hf(6));
        assert!(is_audit_hf(8));
        assert!(!is_audit_hf(7));
        assert!(!is_audit_hf(10));
    }

    #[test]
    fn asset_type_strings() {
        assert_eq!(AssetType::from_str_opt("SAL"), Some(AssetType::Sal));
        assert_eq!(AssetType::Burn.as_str(), "BURN");
        assert!(AssetType::from_str_opt("XYZ").is_none());
    }
}
