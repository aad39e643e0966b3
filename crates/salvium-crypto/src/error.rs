use thiserror::Error;

/// Errors surfaced at the crypto API boundary. No local recovery, no
/// retries; callers format these into their own error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Point bytes do not decode to a canonical curve point.
    #[error("invalid point encoding")]
    InvalidPoint,

    /// Scalar bytes are not canonical (>= the group order).
    #[error("non-canonical scalar encoding")]
    InvalidScalar,

    /// Inverse of zero requested.
    #[error("cannot invert the zero scalar")]
    ZeroInverse,

    /// Ring/commitment vectors disagree in shape or the secret index is
    /// out of bounds.
    #[error("invalid ring shape: {0}")]
    RingShape(String),

    /// Aggregated range proof requested for more outputs than supported.
    #[error("too many range-proof outputs: {0}")]
    TooManyOutputs(usize),
}
