//! Per-family prediction and deviance.
//!
//! Every deviance is "lower is better", zero (or minimal) for a perfect
//! prediction, and takes its logarithms through `util::math` so that
//! `y * ln(y / mu)` is 0 when `y == 0`.

use enetcv_linalg::DenseMatrix;

use super::link::{IdentityLink, LinkFunction, LogLink};
use super::{Family, Response};
use crate::error::Result;
use crate::solver::{LambdaPath, LinearModel, PathOptions, SolverScope};
use crate::util::math::{mean, safe_log, softmax, xlogy};

/// Family-specific operations used by the cross-validation loops.
pub trait FamilyAdapter: Send + Sync {
    fn family(&self) -> Family;

    /// Predicted response (n x k) for the rows of `x`.
    fn predict(&self, model: &LinearModel, x: &DenseMatrix) -> DenseMatrix;

    /// Deviance of `yhat` against `y`. NaN if the response has the wrong shape.
    fn deviance(&self, y: &Response, yhat: &DenseMatrix) -> f64;

    /// Predictions of a reference model with no predictors, fit on the
    /// training rows and evaluated on the rows of `x_test`.
    fn null_prediction(
        &self,
        scope: &SolverScope<'_>,
        x_train: &DenseMatrix,
        y_train: &Response,
        x_test: &DenseMatrix,
    ) -> Result<DenseMatrix>;

    /// Deviance of the no-predictor reference model.
    fn null_deviance(&self, y: &Response, null_prediction: &DenseMatrix) -> f64 {
        self.deviance(y, null_prediction)
    }
}

/// Get the adapter for a family.
pub fn adapter(family: Family) -> Box<dyn FamilyAdapter> {
    match family {
        Family::Gaussian => Box::new(GaussianAdapter),
        Family::Poisson => Box::new(PoissonAdapter),
        Family::Multinomial => Box::new(MultinomialAdapter),
        Family::Cox => Box::new(CoxAdapter),
    }
}

/// Fit an intercept-only model: the first point of a pure-lasso path
/// sits at lambda_max, where every coefficient is zero.
fn intercept_only_model(
    scope: &SolverScope<'_>,
    x_train: &DenseMatrix,
    y_train: &Response,
) -> Result<LinearModel> {
    let options = PathOptions {
        alpha: 1.0,
        lambda: LambdaPath::Auto { nlambda: 2 },
        standardize: false,
        intercept: true,
        pmax: None,
    };
    let path = scope.fit_path(x_train, y_train, &options)?;
    let mut model = path.models[0].clone();
    model.clear_coefficients();
    Ok(model)
}

fn map_linear_predictor(model: &LinearModel, x: &DenseMatrix, link: &dyn LinkFunction) -> DenseMatrix {
    let eta = model.linear_predictor(x);
    DenseMatrix::from_fn(eta.nrows(), eta.ncols(), |i, k| link.inv_link(eta.get(i, k)))
}

#[derive(Debug, Clone, Copy)]
pub struct GaussianAdapter;

impl FamilyAdapter for GaussianAdapter {
    fn family(&self) -> Family {
        Family::Gaussian
    }

    fn predict(&self, model: &LinearModel, x: &DenseMatrix) -> DenseMatrix {
        map_linear_predictor(model, x, &IdentityLink)
    }

    /// Sum of squared residuals.
    fn deviance(&self, y: &Response, yhat: &DenseMatrix) -> f64 {
        match y {
            Response::Continuous(v) => v
                .iter()
                .enumerate()
                .map(|(i, yi)| (yi - yhat.get(i, 0)).powi(2))
                .sum(),
            _ => f64::NAN,
        }
    }

    fn null_prediction(
        &self,
        _scope: &SolverScope<'_>,
        _x_train: &DenseMatrix,
        y_train: &Response,
        x_test: &DenseMatrix,
    ) -> Result<DenseMatrix> {
        let m = y_train.values().map(mean).unwrap_or(f64::NAN);
        Ok(DenseMatrix::from_fn(x_test.nrows(), 1, |_, _| m))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PoissonAdapter;

impl FamilyAdapter for PoissonAdapter {
    fn family(&self) -> Family {
        Family::Poisson
    }

    fn predict(&self, model: &LinearModel, x: &DenseMatrix) -> DenseMatrix {
        map_linear_predictor(model, x, &LogLink)
    }

    /// 2 * sum[y ln(y / mu) - (y - mu)].
    fn deviance(&self, y: &Response, yhat: &DenseMatrix) -> f64 {
        match y {
            Response::Count(v) => {
                2.0 * v
                    .iter()
                    .enumerate()
                    .map(|(i, &yi)| {
                        let mu = yhat.get(i, 0);
                        xlogy(yi, yi) - xlogy(yi, mu) - (yi - mu)
                    })
                    .sum::<f64>()
            }
            _ => f64::NAN,
        }
    }

    fn null_prediction(
        &self,
        scope: &SolverScope<'_>,
        x_train: &DenseMatrix,
        y_train: &Response,
        x_test: &DenseMatrix,
    ) -> Result<DenseMatrix> {
        let model = intercept_only_model(scope, x_train, y_train)?;
        Ok(self.predict(&model, x_test))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MultinomialAdapter;

impl FamilyAdapter for MultinomialAdapter {
    fn family(&self) -> Family {
        Family::Multinomial
    }

    /// Class probabilities, one row per sample.
    fn predict(&self, model: &LinearModel, x: &DenseMatrix) -> DenseMatrix {
        let eta = model.linear_predictor(x);
        let mut out = DenseMatrix::zeros(eta.nrows(), eta.ncols());
        for i in 0..eta.nrows() {
            out.set_row(i, &softmax(&eta.row(i)));
        }
        out
    }

    /// -2 * sum_i ln(sum_k y_ik p_ik) over one-hot rows.
    fn deviance(&self, y: &Response, yhat: &DenseMatrix) -> f64 {
        match y {
            Response::Classes { labels, n_classes } => {
                if yhat.ncols() != *n_classes {
                    return f64::NAN;
                }
                -2.0 * labels
                    .iter()
                    .enumerate()
                    .map(|(i, &l)| safe_log(yhat.get(i, l)))
                    .sum::<f64>()
            }
            _ => f64::NAN,
        }
    }

    fn null_prediction(
        &self,
        scope: &SolverScope<'_>,
        x_train: &DenseMatrix,
        y_train: &Response,
        x_test: &DenseMatrix,
    ) -> Result<DenseMatrix> {
        let model = intercept_only_model(scope, x_train, y_train)?;
        Ok(self.predict(&model, x_test))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoxAdapter;

impl FamilyAdapter for CoxAdapter {
    fn family(&self) -> Family {
        Family::Cox
    }

    /// Relative risk exp(x'beta); the intercept cancels in the partial
    /// likelihood and is ignored.
    fn predict(&self, model: &LinearModel, x: &DenseMatrix) -> DenseMatrix {
        let mut no_intercept = model.clone();
        no_intercept.intercept.iter_mut().for_each(|b| *b = 0.0);
        map_linear_predictor(&no_intercept, x, &LogLink)
    }

    /// Partial likelihood deviance
    /// -2 * sum_{failures n} ln(r_n / sum_{m: t_m >= t_n} r_m).
    fn deviance(&self, y: &Response, yhat: &DenseMatrix) -> f64 {
        match y {
            Response::Survival { time, status } => {
                let mut total = 0.0;
                for n in 0..time.len() {
                    if !status[n] {
                        continue;
                    }
                    let risk_set: f64 = (0..time.len())
                        .filter(|&m| time[m] >= time[n])
                        .map(|m| yhat.get(m, 0))
                        .sum();
                    total += safe_log(yhat.get(n, 0)) - safe_log(risk_set);
                }
                -2.0 * total
            }
            _ => f64::NAN,
        }
    }

    /// Constant relative risk.
    fn null_prediction(
        &self,
        _scope: &SolverScope<'_>,
        _x_train: &DenseMatrix,
        _y_train: &Response,
        x_test: &DenseMatrix,
    ) -> Result<DenseMatrix> {
        Ok(DenseMatrix::from_fn(x_test.nrows(), 1, |_, _| 1.0))
    }
}
