//! Transaction construction, serialization, and validation for Salvium.
//!
//! The builder turns owned one-time outputs plus destinations into a
//! consensus-valid signed transaction; the validator is its inverse.
//! Low-level cryptography lives in `salvium-crypto`; fork rules and
//! consensus arithmetic in `salvium-types`.

pub mod types;
pub mod serialize;
pub mod hash;
pub mod fee;
pub mod decoy;
pub mod builder;
pub mod sign;
pub mod validate;
pub mod stake;

pub use builder::{Destination, PreparedInput, TransactionBuilder, UnsignedTransaction};
pub use decoy::GammaPicker;
pub use fee::FeePriority;
pub use sign::{sign_transaction, sign_transaction_with_progress, SignStage};
pub use stake::{ReturnEvent, StakeEvent, StakeLedger, StakeRecord, StakeStatus};
pub use types::{PrefixExtension, RctSignatures, Transaction, TxInput, TxOutput, TxPrefix};
pub use validate::{
    validate_transaction, IssueKind, MixRing, ValidationContext, ValidationIssue,
    ValidationReport,
};

use thiserror::Error;

/// Errors at the builder/serializer API boundary. The validator does not
/// use this type; it accumulates issues in a `ValidationReport` instead.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("ring shape: {0}")]
    RingShape(String),

    #[error("signing failed: {0}")]
    Signature(String),

    #[error("range proof failed: {0}")]
    RangeProof(String),

    #[error("amount overflow")]
    Overflow,

    #[error("decoy selection failed: {0}")]
    DecoySelection(String),
}

impl From<salvium_crypto::CryptoError> for TxError {
    fn from(e: salvium_crypto::CryptoError) -> Self {
        use salvium_crypto::CryptoError;
        match e {
            CryptoError::RingShape(msg) => TxError::RingShape(msg),
            CryptoError::TooManyOutputs(n) => {
                TxError::RangeProof(format!("{n} outputs exceed proof capacity"))
            }
            other => TxError::InvalidInput(other.to_string()),
        }
    }
}
