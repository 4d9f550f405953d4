//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PredictError, Result};
use crate::solver::SolverConfig;

/// Default elastic-net mixing weights searched by the inner loop.
pub const DEFAULT_ALPHA_GRID: [f64; 6] = [0.01, 0.1, 0.4, 0.7, 0.9, 0.99];

/// Configuration for a prediction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    /// Keep only this many features after the coarse pre-filter.
    pub prefilter_features: Option<usize>,
    /// Largest number of nonzero features the solver may return.
    pub max_active_features: Option<usize>,
    /// Mixing weights searched by the inner cross-validation.
    pub alpha_grid: Vec<f64>,
    /// Outer and inner fold counts; 0 means leave-one-out.
    pub cv_scheme: [usize; 2],
    /// Number of permutations, the unpermuted reference included.
    pub n_perm: usize,
    /// Length of automatically generated penalty paths.
    pub nlambda: usize,
    /// Accepted for compatibility, plotting is not supported.
    pub show_scatter: bool,
    /// Log per-fold selections at info level.
    pub verbose: bool,
    /// Seed for fold assignment and permutations.
    pub seed: u64,
    pub solver: SolverConfig,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            prefilter_features: None,
            max_active_features: None,
            alpha_grid: DEFAULT_ALPHA_GRID.to_vec(),
            cv_scheme: [10, 10],
            n_perm: 1,
            nlambda: 100,
            show_scatter: false,
            verbose: false,
            seed: 0,
            solver: SolverConfig::default(),
        }
    }
}

impl PredictConfig {
    /// Check the configuration against a data set of `n_samples` rows.
    pub fn validate(&self, n_samples: usize) -> Result<()> {
        if self.alpha_grid.is_empty() {
            return Err(PredictError::Configuration("alpha grid is empty".into()));
        }
        if let Some(a) = self.alpha_grid.iter().find(|a| !(0.0..=1.0).contains(*a)) {
            return Err(PredictError::Configuration(format!(
                "alpha {} outside [0, 1]",
                a
            )));
        }
        for (name, k) in [("outer", self.cv_scheme[0]), ("inner", self.cv_scheme[1])] {
            if k == 1 {
                return Err(PredictError::Configuration(format!(
                    "{} fold count must be 0 (leave-one-out) or at least 2",
                    name
                )));
            }
        }
        if self.cv_scheme[0] > n_samples {
            return Err(PredictError::Configuration(format!(
                "{} outer folds requested for {} samples",
                self.cv_scheme[0], n_samples
            )));
        }
        if self.n_perm == 0 {
            return Err(PredictError::Configuration("n_perm must be at least 1".into()));
        }
        if self.nlambda < 2 {
            return Err(PredictError::Configuration("nlambda must be at least 2".into()));
        }
        if self.prefilter_features == Some(0) {
            return Err(PredictError::Configuration(
                "the pre-filter must keep at least one feature".into(),
            ));
        }
        if self.max_active_features == Some(0) {
            return Err(PredictError::Configuration(
                "max_active_features must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
