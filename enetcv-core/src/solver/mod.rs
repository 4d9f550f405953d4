//! Elastic-net path solver interface.
//!
//! The cross-validation code only needs "fit a penalty path, get back
//! coefficients per lambda". That contract is the [`PathSolver`] trait;
//! [`CoordinateDescent`] is the in-process implementation.
//! Solver calls go through a [`SolverScope`], which owns the solver's
//! scratch space for the duration of a run and checks every returned path.

pub mod coordinate;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use enetcv_linalg::DenseMatrix;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{PredictError, Result};
use crate::family::Response;

pub use coordinate::{CoordinateDescent, SolverConfig};

/// Coefficients at or below this magnitude count as zero.
pub const ZERO_TOL: f64 = 1e-12;

/// Penalty path request.
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaPath {
    /// Generate `nlambda` log-spaced values down from lambda_max.
    Auto { nlambda: usize },
    /// Use these values, in decreasing order.
    Explicit(Vec<f64>),
}

/// Options for a single path fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PathOptions {
    /// Elastic-net mixing weight: 1 is lasso, 0 is ridge.
    pub alpha: f64,
    pub lambda: LambdaPath,
    /// Standardize columns internally (coefficients are returned on the
    /// original scale).
    pub standardize: bool,
    pub intercept: bool,
    /// Stop the path once more than this many features are nonzero.
    pub pmax: Option<usize>,
}

/// A fitted linear predictor: p x k coefficients and k intercepts.
///
/// k is the number of classes for multinomial responses and 1 otherwise.
#[derive(Debug, Clone)]
pub struct LinearModel {
    pub coefficients: DenseMatrix,
    pub intercept: Vec<f64>,
}

impl LinearModel {
    pub fn zeros(n_features: usize, n_outputs: usize) -> Self {
        Self {
            coefficients: DenseMatrix::zeros(n_features, n_outputs),
            intercept: vec![0.0; n_outputs],
        }
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn n_outputs(&self) -> usize {
        self.coefficients.ncols()
    }

    /// eta = intercept + X * beta, n x k.
    pub fn linear_predictor(&self, x: &DenseMatrix) -> DenseMatrix {
        assert_eq!(x.ncols(), self.n_features());
        let mut eta = DenseMatrix::zeros(x.nrows(), self.n_outputs());
        for k in 0..self.n_outputs() {
            let col = x.mat_vec(&self.coefficients.col(k));
            let b0 = self.intercept[k];
            eta.set_col(k, &col.iter().map(|v| v + b0).collect::<Vec<_>>());
        }
        eta
    }

    /// Sum over outputs of |beta_jk|.
    pub fn feature_magnitude(&self, j: usize) -> f64 {
        (0..self.n_outputs())
            .map(|k| self.coefficients.get(j, k).abs())
            .sum()
    }

    /// Features with a nonzero coefficient for any output.
    pub fn active_features(&self) -> Vec<usize> {
        (0..self.n_features())
            .filter(|&j| self.feature_magnitude(j) > ZERO_TOL)
            .collect()
    }

    pub fn clear_coefficients(&mut self) {
        self.coefficients = DenseMatrix::zeros(self.n_features(), self.n_outputs());
    }
}

/// Fitted models along a penalty path.
///
/// The solver may stop early, so `lambdas` can be shorter than requested.
#[derive(Debug, Clone)]
pub struct FitPath {
    pub lambdas: Vec<f64>,
    pub models: Vec<LinearModel>,
}

impl FitPath {
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// An elastic-net path solver.
pub trait PathSolver: Send + Sync {
    /// Whether the solver needs a scratch directory.
    fn needs_scratch(&self) -> bool {
        false
    }

    /// Fit the penalty path for `x` and `y`. The response variant selects
    /// the family. `scratch` is the scope's scratch directory, if any.
    fn fit_path(
        &self,
        scratch: Option<&Path>,
        x: &DenseMatrix,
        y: &Response,
        options: &PathOptions,
    ) -> Result<FitPath>;
}

/// A solver held for the lifetime of a run.
///
/// Owns the solver's scratch directory, removed on drop whether the run
/// ends normally or by `?`.
pub struct SolverScope<'a> {
    solver: &'a dyn PathSolver,
    scratch: Option<TempDir>,
    n_fits: AtomicUsize,
}

impl<'a> SolverScope<'a> {
    pub fn open(solver: &'a dyn PathSolver) -> Result<Self> {
        let scratch = if solver.needs_scratch() {
            let dir = tempfile::Builder::new().prefix("enetcv-solver-").tempdir()?;
            debug!("Solver scratch directory: {}", dir.path().display());
            Some(dir)
        } else {
            None
        };
        Ok(Self {
            solver,
            scratch,
            n_fits: AtomicUsize::new(0),
        })
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|d| d.path())
    }

    /// Number of path fits made through this scope.
    pub fn n_fits(&self) -> usize {
        self.n_fits.load(Ordering::Relaxed)
    }

    /// Fit a path and check its shape. A failed or malformed fit is fatal.
    pub fn fit_path(&self, x: &DenseMatrix, y: &Response, options: &PathOptions) -> Result<FitPath> {
        if x.nrows() != y.len() {
            return Err(PredictError::DimensionMismatch {
                what: "solver response",
                expected: x.nrows(),
                got: y.len(),
            });
        }
        self.n_fits.fetch_add(1, Ordering::Relaxed);
        let path = self.solver.fit_path(self.scratch_dir(), x, y, options)?;

        if path.is_empty() || path.lambdas.len() != path.models.len() {
            return Err(PredictError::Solver(format!(
                "solver returned {} models for {} lambdas",
                path.models.len(),
                path.lambdas.len()
            )));
        }
        for model in &path.models {
            if model.n_features() != x.ncols() || model.n_outputs() != y.n_outputs() {
                return Err(PredictError::Solver(format!(
                    "solver returned a {}x{} coefficient matrix, expected {}x{}",
                    model.n_features(),
                    model.n_outputs(),
                    x.ncols(),
                    y.n_outputs()
                )));
            }
            if !model.coefficients.all_finite() || model.intercept.iter().any(|b| !b.is_finite()) {
                return Err(PredictError::Solver("solver returned non-finite coefficients".into()));
            }
        }
        Ok(path)
    }
}

impl Drop for SolverScope<'_> {
    fn drop(&mut self) {
        debug!("Closing solver scope after {} path fits", self.n_fits());
    }
}
