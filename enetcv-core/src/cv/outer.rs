//! Outer evaluation loop.
//!
//! Every outer fold is deconfounded, standardized and passed through the
//! nested selector using its training rows only; the resulting model
//! predicts the fold's held-out rows.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use enetcv_linalg::DenseMatrix;

use super::deconfound::Deconfounder;
use super::folds::{local_pairs, make_folds};
use super::selection::Selector;
use super::standardize::Standardizer;
use crate::error::{PredictError, Result};
use crate::family::{Family, Response};

/// Data for one pass of the outer loop.
pub struct OuterInputs<'a> {
    pub x: &'a DenseMatrix,
    /// Response for this pass, already permuted.
    pub y: &'a Response,
    pub confounds: Option<&'a DenseMatrix>,
    pub pairs: &'a [(usize, usize)],
    /// Also produce reference predictions of a model with no features.
    pub compute_null: bool,
}

/// What one outer fold selected.
#[derive(Debug, Clone, Serialize)]
pub struct FoldSummary {
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub alpha: f64,
    pub lambda: f64,
    pub n_active: usize,
    /// Selected features, as column indices of the input matrix.
    pub features: Vec<usize>,
    pub forced_inclusion: bool,
}

/// Held-out predictions of one outer-loop pass, one row per sample.
#[derive(Debug, Clone)]
pub struct OuterResult {
    /// Original-space predictions.
    pub predictions: DenseMatrix,
    pub null_predictions: Option<DenseMatrix>,
    /// Present when confounds were given.
    pub deconfounded: Option<DeconfoundedResult>,
    pub folds: Vec<FoldSummary>,
}

/// Deconfounded-space view of a pass.
#[derive(Debug, Clone)]
pub struct DeconfoundedResult {
    pub predictions: DenseMatrix,
    pub null_predictions: Option<DenseMatrix>,
    /// Held-out response after removing the training-fold confound fit.
    pub response: Response,
}

fn scatter(target: &mut DenseMatrix, rows: &[usize], values: &DenseMatrix) {
    for (local, &i) in rows.iter().enumerate() {
        target.set_row(i, &values.row(local));
    }
}

fn scatter_response(target: &mut [f64], rows: &[usize], values: &Response) {
    if let Some(v) = values.values() {
        for (local, &i) in rows.iter().enumerate() {
            target[i] = v[local];
        }
    }
}

/// Run the outer cross-validation once.
pub fn run_outer_loop<R: Rng + ?Sized>(
    selector: &Selector<'_>,
    inputs: &OuterInputs<'_>,
    rng: &mut R,
) -> Result<OuterResult> {
    let (x, y) = (inputs.x, inputs.y);
    let n = y.len();
    if x.nrows() != n {
        return Err(PredictError::DimensionMismatch {
            what: "feature rows",
            expected: n,
            got: x.nrows(),
        });
    }
    let family = selector.family;
    let k = y.n_outputs();
    let continuous = family.family() == Family::Gaussian;

    let folds = make_folds(y, selector.config.cv_scheme[0], inputs.pairs, rng)?;

    let mut predictions = DenseMatrix::zeros(n, k);
    let mut null_predictions = inputs.compute_null.then(|| DenseMatrix::zeros(n, k));
    let mut deconf_predictions = inputs.confounds.map(|_| DenseMatrix::zeros(n, k));
    let mut deconf_null = inputs
        .confounds
        .filter(|_| inputs.compute_null)
        .map(|_| DenseMatrix::zeros(n, k));
    let mut deconf_response = y.values().map(|v| v.to_vec());
    let mut summaries = Vec::with_capacity(folds.n_folds());

    for f in 0..folds.n_folds() {
        let (train, test) = (folds.train(f), folds.test(f).to_vec());
        let mut x_train = x.select_rows(&train);
        let mut x_test = x.select_rows(&test);
        let y_train = y.select(&train);
        let y_test = y.select(&test);

        let mut deconf = None;
        let (mut y_train_fit, mut y_test_fit) = (y_train.clone(), y_test.clone());
        if let Some(c) = inputs.confounds {
            let (c_train, c_test) = (c.select_rows(&train), c.select_rows(&test));
            let d = Deconfounder::fit(&x_train, Some(&y_train), &c_train)?;
            x_train = d.residualize_x(&x_train, &c_train)?;
            x_test = d.residualize_x(&x_test, &c_test)?;
            y_train_fit = d.residualize_y(&y_train, &c_train)?;
            y_test_fit = d.residualize_y(&y_test, &c_test)?;
            deconf = Some((d, c_test));
        }

        let standardizer = Standardizer::fit(&x_train);
        let x_train = standardizer.apply(&x_train);
        let x_test = standardizer.apply(&x_test);

        let pairs = local_pairs(inputs.pairs, &train, n);
        let selected = selector.select(&x_train, &y_train_fit, &pairs, rng)?;
        let fit_space = family.predict(&selected.model, &selected.features.select(&x_test));

        match (&deconf, deconf_predictions.as_mut()) {
            (Some((d, c_test)), Some(target)) => {
                scatter(target, &test, &fit_space);
                let restored = if continuous { d.restore_y(&fit_space, c_test)? } else { fit_space };
                scatter(&mut predictions, &test, &restored);
                if let Some(target) = deconf_response.as_mut() {
                    scatter_response(target, &test, &y_test_fit);
                }
            }
            _ => scatter(&mut predictions, &test, &fit_space),
        }

        if let Some(target) = null_predictions.as_mut() {
            let null = family.null_prediction(selector.scope, &x_train, &y_train, &x_test)?;
            scatter(target, &test, &null);
        }
        if let Some(target) = deconf_null.as_mut() {
            let null = family.null_prediction(selector.scope, &x_train, &y_train_fit, &x_test)?;
            scatter(target, &test, &null);
        }

        let summary = FoldSummary {
            fold: f,
            n_train: train.len(),
            n_test: test.len(),
            alpha: selected.alpha,
            lambda: selected.lambda,
            n_active: selected.n_active(),
            features: selected.features.indices().to_vec(),
            forced_inclusion: selected.forced_inclusion,
        };
        if selector.config.verbose {
            info!(
                "Fold {}/{}: alpha={} lambda={:.4e} active={}",
                f + 1,
                folds.n_folds(),
                summary.alpha,
                summary.lambda,
                summary.n_active
            );
        } else {
            debug!(
                "Fold {}/{}: alpha={} lambda={:.4e} active={}",
                f + 1,
                folds.n_folds(),
                summary.alpha,
                summary.lambda,
                summary.n_active
            );
        }
        summaries.push(summary);
    }

    let deconfounded = deconf_predictions.map(|predictions| DeconfoundedResult {
        predictions,
        null_predictions: deconf_null,
        response: match (y, deconf_response) {
            (Response::Continuous(_), Some(v)) => Response::Continuous(v),
            _ => y.clone(),
        },
    });

    Ok(OuterResult {
        predictions,
        null_predictions,
        deconfounded,
        folds: summaries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictConfig;
    use crate::family::adapter;
    use crate::solver::{CoordinateDescent, SolverScope};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_outer_loop_with_confounds_restores_scale() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let n = 40;
        let c = DenseMatrix::from_fn(n, 1, |_, _| rng.gen::<f64>());
        let x = DenseMatrix::from_fn(n, 4, |i, _| rng.gen::<f64>() + c.get(i, 0));
        let y = Response::Continuous(
            (0..n)
                .map(|i| 10.0 + 2.0 * x.get(i, 0) + 5.0 * c.get(i, 0))
                .collect(),
        );

        let solver = CoordinateDescent::default();
        let scope = SolverScope::open(&solver).unwrap();
        let family = adapter(y.family());
        let config = PredictConfig {
            alpha_grid: vec![1.0],
            cv_scheme: [4, 4],
            nlambda: 20,
            ..Default::default()
        };
        let selector = Selector {
            scope: &scope,
            family: family.as_ref(),
            config: &config,
        };
        let inputs = OuterInputs {
            x: &x,
            y: &y,
            confounds: Some(&c),
            pairs: &[],
            compute_null: true,
        };
        let result = run_outer_loop(&selector, &inputs, &mut rng).unwrap();

        assert_eq!(result.folds.len(), 4);
        let deconf = result.deconfounded.unwrap();
        // Deconfounded predictions are centred, original ones are not
        let mean_orig: f64 = result.predictions.col(0).iter().sum::<f64>() / n as f64;
        let mean_deconf: f64 = deconf.predictions.col(0).iter().sum::<f64>() / n as f64;
        assert!(mean_orig > 10.0);
        assert!(mean_deconf.abs() < 1.0);
        assert!(deconf.null_predictions.is_some());
        assert!(result.null_predictions.is_some());
    }
}
