//! Nested model selection for one outer training fold.
//!
//! 1. Optional pre-filter: rank features by a lightly penalised fit and
//!    keep the strongest.
//! 2. Inner cross-validation over the alpha grid, each alpha with its own
//!    lambda path, picking the (lambda, alpha) with least summed deviance.
//! 3. Narrow refit around the chosen lambda; features nonzero at the
//!    sparsest end form the mask (at least two are kept).
//! 4. Inner cross-validation over lambda alone on the masked features,
//!    then the final refit.

use rand::Rng;
use rayon::prelude::*;
use tracing::{trace, warn};

use enetcv_linalg::DenseMatrix;

use super::folds::{make_folds, FoldAssignment};
use crate::config::PredictConfig;
use crate::error::{PredictError, Result};
use crate::family::{FamilyAdapter, Response};
use crate::solver::{FitPath, LambdaPath, LinearModel, PathOptions, SolverScope};

/// Multiples of the selected lambda refit to find the feature mask.
pub const NARROW_PATH: [f64; 3] = [1.1, 1.0, 0.9];
/// Mixing weight of the pre-filter fit.
pub const PREFILTER_ALPHA: f64 = 0.01;
/// Fractions of lambda_max used by the pre-filter fit.
pub const PREFILTER_PATH: [f64; 2] = [0.1, 0.01];
/// Fewest features a selected model may keep.
pub const MIN_FEATURES: usize = 2;

/// Positions of a reduced feature set in the original feature matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMap {
    original: Vec<usize>,
}

impl FeatureMap {
    pub fn identity(p: usize) -> Self {
        Self {
            original: (0..p).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Original index of reduced feature `k`.
    pub fn original_index(&self, k: usize) -> usize {
        self.original[k]
    }

    pub fn indices(&self) -> &[usize] {
        &self.original
    }

    /// Keep the reduced features at positions `local`.
    pub fn restrict(&self, local: &[usize]) -> FeatureMap {
        FeatureMap {
            original: local.iter().map(|&k| self.original[k]).collect(),
        }
    }

    /// Columns of an original-space matrix covered by this map.
    pub fn select(&self, x: &DenseMatrix) -> DenseMatrix {
        x.select_cols(&self.original)
    }
}

/// Final model of one outer fold.
#[derive(Debug, Clone)]
pub struct SelectedModel {
    /// Coefficients over the features of `features`, in that order.
    pub model: LinearModel,
    pub features: FeatureMap,
    pub alpha: f64,
    pub lambda: f64,
    /// The mask fell below the minimum and ranked features were added.
    pub forced_inclusion: bool,
}

impl SelectedModel {
    pub fn n_active(&self) -> usize {
        self.model.active_features().len()
    }
}

/// Shared state of the selection steps.
pub struct Selector<'a> {
    pub scope: &'a SolverScope<'a>,
    pub family: &'a dyn FamilyAdapter,
    pub config: &'a PredictConfig,
}

/// Lambda path of one alpha and its summed inner-fold deviance.
#[derive(Debug, Clone)]
struct GridColumn {
    lambdas: Vec<f64>,
    deviance: Vec<f64>,
}

impl<'a> Selector<'a> {
    fn options(&self, alpha: f64, lambda: LambdaPath) -> PathOptions {
        PathOptions {
            alpha,
            lambda,
            standardize: true,
            intercept: true,
            pmax: self.config.max_active_features,
        }
    }

    /// Features ordered from strongest to weakest by a lightly penalised
    /// two-point fit. Ties keep index order.
    pub fn rank_features(&self, x: &DenseMatrix, y: &Response) -> Result<Vec<usize>> {
        let scout = self
            .scope
            .fit_path(x, y, &self.options(PREFILTER_ALPHA, LambdaPath::Auto { nlambda: 2 }))?;
        let lambda_max = scout.lambdas[0];
        let explicit = PREFILTER_PATH.iter().map(|f| f * lambda_max).collect();
        let path = self
            .scope
            .fit_path(x, y, &self.options(PREFILTER_ALPHA, LambdaPath::Explicit(explicit)))?;
        let model = &path.models[path.len() - 1];

        let magnitude: Vec<f64> = (0..x.ncols()).map(|j| model.feature_magnitude(j)).collect();
        let mut order: Vec<usize> = (0..x.ncols()).collect();
        order.sort_by(|&a, &b| magnitude[b].total_cmp(&magnitude[a]));
        Ok(order)
    }

    /// Summed held-out deviance of each lambda over the inner folds,
    /// truncated to the lambdas every fold's path reached.
    fn inner_deviance(
        &self,
        x: &DenseMatrix,
        y: &Response,
        folds: &FoldAssignment,
        alpha: f64,
        lambdas: &[f64],
    ) -> Result<Vec<f64>> {
        let mut total = vec![0.0; lambdas.len()];
        let mut reached = lambdas.len();
        for k in 0..folds.n_folds() {
            let (train, test) = (folds.train(k), folds.test(k));
            let path = self.scope.fit_path(
                &x.select_rows(&train),
                &y.select(&train),
                &self.options(alpha, LambdaPath::Explicit(lambdas.to_vec())),
            )?;
            reached = reached.min(path.len());
            let x_test = x.select_rows(test);
            let y_test = y.select(test);
            for (i, model) in path.models.iter().enumerate().take(reached) {
                total[i] += self.family.deviance(&y_test, &self.family.predict(model, &x_test));
            }
        }
        total.truncate(reached);
        Ok(total)
    }

    fn grid_column(&self, x: &DenseMatrix, y: &Response, folds: &FoldAssignment, alpha: f64) -> Result<GridColumn> {
        let path = self.scope.fit_path(
            x,
            y,
            &self.options(alpha, LambdaPath::Auto { nlambda: self.config.nlambda }),
        )?;
        let deviance = self.inner_deviance(x, y, folds, alpha, &path.lambdas)?;
        let mut lambdas = path.lambdas;
        lambdas.truncate(deviance.len());
        Ok(GridColumn { lambdas, deviance })
    }

    /// Run all four steps on a standardized training fold. `pairs` are
    /// dependency pairs in the fold's local indexing.
    pub fn select<R: Rng + ?Sized>(
        &self,
        x: &DenseMatrix,
        y: &Response,
        pairs: &[(usize, usize)],
        rng: &mut R,
    ) -> Result<SelectedModel> {
        let p = x.ncols();

        // 1. Pre-filter
        let mut ranking = None;
        let features = match self.config.prefilter_features {
            Some(keep) if keep < p => {
                let order = self.rank_features(x, y)?;
                let mut kept = order[..keep].to_vec();
                kept.sort_unstable();
                ranking = Some(order);
                FeatureMap {
                    original: kept,
                }
            }
            _ => FeatureMap::identity(p),
        };
        let x_reduced = features.select(x);

        // 2. Inner CV over (lambda, alpha)
        let folds = make_folds(y, self.config.cv_scheme[1], pairs, rng)?;
        let grid: Vec<GridColumn> = self
            .config
            .alpha_grid
            .par_iter()
            .map(|&alpha| self.grid_column(&x_reduced, y, &folds, alpha))
            .collect::<Result<_>>()?;
        let (li, ai) = best_cell(&grid).ok_or_else(|| {
            PredictError::Numerical("no finite inner cross-validation deviance".into())
        })?;
        let alpha = self.config.alpha_grid[ai];
        let lambda = grid[ai].lambdas[li];
        trace!("Inner CV picked alpha={} lambda={:.4e}", alpha, lambda);

        // 3. Narrow refit for the feature mask
        let narrow = NARROW_PATH.iter().map(|m| m * lambda).collect();
        let path = self
            .scope
            .fit_path(&x_reduced, y, &self.options(alpha, LambdaPath::Explicit(narrow)))?;
        let mut mask = path.models[0].active_features();
        let forced_inclusion = mask.len() < MIN_FEATURES;
        if forced_inclusion {
            let order = match ranking {
                Some(order) => order
                    .into_iter()
                    .filter_map(|j| features.indices().iter().position(|&f| f == j))
                    .collect(),
                None => self.rank_features(&x_reduced, y)?,
            };
            for j in order {
                if mask.len() >= MIN_FEATURES.min(x_reduced.ncols()) {
                    break;
                }
                if !mask.contains(&j) {
                    mask.push(j);
                }
            }
            mask.sort_unstable();
            warn!(
                "Selected model kept fewer than {} features; forcing in {:?}",
                MIN_FEATURES,
                mask.iter().map(|&j| features.original_index(j)).collect::<Vec<_>>()
            );
        }
        let features = features.restrict(&mask);
        let x_masked = x_reduced.select_cols(&mask);

        // 4. Inner CV over lambda on the masked features, then refit
        let column = self.grid_column(&x_masked, y, &folds, alpha)?;
        let best = best_cell(std::slice::from_ref(&column))
            .map(|(li, _)| li)
            .ok_or_else(|| PredictError::Numerical("no finite refined deviance".into()))?;
        let final_path = self.scope.fit_path(
            &x_masked,
            y,
            &self.options(alpha, LambdaPath::Explicit(column.lambdas[..=best].to_vec())),
        )?;
        let model = last_model(final_path)?;

        Ok(SelectedModel {
            model,
            features,
            alpha,
            lambda: column.lambdas[best],
            forced_inclusion,
        })
    }
}

/// Least deviance in a row-major scan over (lambda index, alpha index);
/// the first strict minimum wins.
fn best_cell(grid: &[GridColumn]) -> Option<(usize, usize)> {
    let rows = grid.iter().map(|c| c.deviance.len()).max().unwrap_or(0);
    let mut best: Option<(usize, usize, f64)> = None;
    for li in 0..rows {
        for (ai, column) in grid.iter().enumerate() {
            let Some(&d) = column.deviance.get(li) else {
                continue;
            };
            if d.is_finite() && best.map_or(true, |(_, _, b)| d < b) {
                best = Some((li, ai, d));
            }
        }
    }
    best.map(|(li, ai, _)| (li, ai))
}

fn last_model(path: FitPath) -> Result<LinearModel> {
    path.models
        .into_iter()
        .last()
        .ok_or_else(|| PredictError::Solver("solver returned an empty path".into()))
}
