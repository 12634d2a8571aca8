use thiserror::Error;

/// Errors returned by clustering operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding is empty")]
    EmptyEmbedding,

    #[error("embedding has non-finite value at index {index}")]
    NonFiniteEmbedding { index: usize },

    #[error("cluster not found: {id} (owner {owner})")]
    ClusterNotFound { owner: String, id: String },

    #[error("invalid threshold {0}: must be in (0, 1]")]
    InvalidThreshold(f32),

    #[error("owner mismatch: store belongs to {expected}, got {got}")]
    OwnerMismatch { expected: String, got: String },

    #[error("store error: {0}")]
    Store(String),
}
