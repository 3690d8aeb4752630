/// Errors produced by the risk-scoring engine.
///
/// Every failure is local and synchronous. Training-time errors are meant to
/// halt the training pipeline; at inference time only [`RiskError::NotFitted`]
/// and [`RiskError::DimensionMismatch`] can surface.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("feature dimension {dimension} has zero variance")]
    DegenerateDimension { dimension: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("clustering failed: {0}")]
    ClusteringFailed(String),

    #[error("no pose detected in frame")]
    NotDetected,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;
