use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("invalid scalar literal for {field}: {value:?}")]
    InvalidScalarLiteral { field: String, value: String },

    #[error("instance group {group} has {count} values but {available} Lagrange commitments are available")]
    InstanceCountMismatch {
        group: usize,
        count: usize,
        available: usize,
    },

    #[error("G2 point {index} is not a valid subgroup point")]
    InvalidG2Point { index: usize },

    #[error("G1 point {index} is not on the curve")]
    InvalidG1Point { index: usize },

    #[error("proof of {len} elements is not a whole number of words")]
    InvalidProofSize { len: usize },

    #[error("transcript has {actual} words, expected {expected}")]
    InvalidTranscriptLength { expected: usize, actual: usize },

    #[error("invalid query schema: {reason}")]
    InvalidQuerySchema { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("proof is invalid")]
    ProofInvalid,
}

pub type Result<T> = std::result::Result<T, VerifierError>;
