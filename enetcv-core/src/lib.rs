//! enetcv-core: Statistical algorithms for enetcv
//!
//! Nested cross-validated elastic-net prediction for continuous, count,
//! multi-class and survival responses: fold generation, confound
//! removal, two-stage feature selection, held-out evaluation and
//! permutation testing under sample dependency structure.

pub mod config;
pub mod cv;
pub mod error;
pub mod family;
pub mod predict;
pub mod solver;
pub mod stats;
pub mod util;

pub use config::PredictConfig;
pub use error::{PredictError, Result};
pub use family::{Family, Response};
pub use predict::{run_prediction, run_prediction_with, PredictionInputs, PredictionOutcome, PredictionStats};
