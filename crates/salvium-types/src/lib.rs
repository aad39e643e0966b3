//! Shared type definitions and consensus parameters for the Salvium
//! transaction engine.
//!
//! Everything here is pure data: enums for the on-chain discriminants,
//! the hard-fork schedule, and the fee/weight arithmetic derived from it.

pub mod constants;
pub mod consensus;

pub use constants::{
    is_audit_hf, AssetType, HfVersion, Network, OutputTarget, RctType, TxType,
    AMOUNT_BITS, BULLETPROOF_MAX_OUTPUTS, DEFAULT_RING_SIZE, DEFAULT_TX_SPENDABLE_AGE,
    DIFFICULTY_TARGET, LEGACY_RING_SIZE, TRANSACTION_VERSION_2_OUTS,
    TRANSACTION_VERSION_CARROT, TRANSACTION_VERSION_N_OUTS, TXIN_GEN, TXIN_KEY,
};
pub use consensus::{
    calculate_required_fee, fee_quantization_mask, hf_version_for_height, max_tx_weight,
    rct_type_for_hf, stake_lock_period, tx_version_allowed, tx_version_for_hf,
};
