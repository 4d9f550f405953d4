//! Error types for the prediction pipeline.

use enetcv_linalg::LinalgError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    /// Invalid fold counts, too many classes, mismatched permutation sets.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ill-conditioned confound regression or a non-finite statistic.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// The path solver failed or returned an unusable path.
    #[error("Solver failure: {0}")]
    Solver(String),

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Linalg(#[from] LinalgError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PredictError>;
