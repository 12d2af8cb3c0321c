use thiserror::Error;

use crate::AnalysisPhase;

#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Insufficient data: {0}")]
    DataInsufficient(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Empty graph: {0}")]
    EmptyGraph(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Computation timed out after {elapsed_ms}ms")]
    ComputationTimeout { elapsed_ms: u64 },

    #[error("Computation failed ({phase}): {message}")]
    Computation {
        phase: AnalysisPhase,
        message: String,
    },
}
