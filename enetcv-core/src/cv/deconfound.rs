//! Linear confound removal.
//!
//! Each feature column (and a continuous response) is regressed on the
//! confounds plus an intercept using training rows only. The fitted
//! coefficients are then applied unchanged to held-out rows.

use enetcv_linalg::decomposition::least_squares;
use enetcv_linalg::DenseMatrix;

use crate::error::{PredictError, Result};
use crate::family::Response;

/// Confound regression fitted on one training fold.
#[derive(Debug, Clone)]
pub struct Deconfounder {
    /// (q + 1) x p coefficients, intercept row first.
    x_coef: DenseMatrix,
    /// q + 1 coefficients for a continuous response.
    y_coef: Option<Vec<f64>>,
}

impl Deconfounder {
    /// Fit on training rows. Only a continuous response is deconfounded.
    pub fn fit(x: &DenseMatrix, y: Option<&Response>, confounds: &DenseMatrix) -> Result<Self> {
        if confounds.nrows() != x.nrows() {
            return Err(PredictError::DimensionMismatch {
                what: "confound rows",
                expected: x.nrows(),
                got: confounds.nrows(),
            });
        }
        let design = confounds.with_intercept();
        let x_coef = least_squares(&design, x).map_err(numerical)?;

        let y_coef = match y {
            Some(Response::Continuous(v)) => {
                let coef = least_squares(&design, &DenseMatrix::column_vector(v)).map_err(numerical)?;
                Some(coef.col(0))
            }
            _ => None,
        };

        Ok(Self { x_coef, y_coef })
    }

    pub fn residualize_x(&self, x: &DenseMatrix, confounds: &DenseMatrix) -> Result<DenseMatrix> {
        self.check(x.nrows(), confounds)?;
        if x.ncols() != self.x_coef.ncols() {
            return Err(PredictError::DimensionMismatch {
                what: "deconfounded features",
                expected: self.x_coef.ncols(),
                got: x.ncols(),
            });
        }
        Ok(x.sub(&confounds.with_intercept().mat_mul(&self.x_coef)))
    }

    /// Continuous responses lose their confound fit; others pass through.
    pub fn residualize_y(&self, y: &Response, confounds: &DenseMatrix) -> Result<Response> {
        match (y, self.confound_fit(confounds)?) {
            (Response::Continuous(v), Some(fit)) => Ok(Response::Continuous(
                v.iter().zip(fit.iter()).map(|(a, b)| a - b).collect(),
            )),
            _ => Ok(y.clone()),
        }
    }

    /// Map deconfounded-space predictions back to the original space.
    pub fn restore_y(&self, yhat: &DenseMatrix, confounds: &DenseMatrix) -> Result<DenseMatrix> {
        match self.confound_fit(confounds)? {
            Some(fit) => Ok(DenseMatrix::from_fn(yhat.nrows(), yhat.ncols(), |i, k| {
                yhat.get(i, k) + fit[i]
            })),
            None => Ok(yhat.clone()),
        }
    }

    fn confound_fit(&self, confounds: &DenseMatrix) -> Result<Option<Vec<f64>>> {
        match &self.y_coef {
            Some(coef) => {
                self.check(confounds.nrows(), confounds)?;
                Ok(Some(confounds.with_intercept().mat_vec(coef)))
            }
            None => Ok(None),
        }
    }

    fn check(&self, rows: usize, confounds: &DenseMatrix) -> Result<()> {
        if confounds.nrows() != rows {
            return Err(PredictError::DimensionMismatch {
                what: "confound rows",
                expected: rows,
                got: confounds.nrows(),
            });
        }
        if confounds.ncols() + 1 != self.x_coef.nrows() {
            return Err(PredictError::DimensionMismatch {
                what: "confound columns",
                expected: self.x_coef.nrows() - 1,
                got: confounds.ncols(),
            });
        }
        Ok(())
    }
}

fn numerical(e: enetcv_linalg::LinalgError) -> PredictError {
    PredictError::Numerical(format!("confound regression is ill-conditioned: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::math::mean;

    fn confounds() -> DenseMatrix {
        DenseMatrix::from_fn(8, 1, |i, _| i as f64)
    }

    #[test]
    fn test_residuals_uncorrelated_with_confound() {
        let c = confounds();
        let x = DenseMatrix::from_fn(8, 2, |i, j| 2.0 * i as f64 + ((i * 5 + j) % 3) as f64);
        let d = Deconfounder::fit(&x, None, &c).unwrap();
        let r = d.residualize_x(&x, &c).unwrap();
        for j in 0..2 {
            let col = r.col(j);
            let cov: f64 = col.iter().enumerate().map(|(i, v)| v * (i as f64 - 3.5)).sum();
            assert!(cov.abs() < 1e-9);
            assert!(mean(&col).abs() < 1e-9);
        }
        assert!(d.y_coef.is_none());
    }

    #[test]
    fn test_response_roundtrip() {
        let c = confounds();
        let x = DenseMatrix::from_fn(8, 1, |i, _| (i % 3) as f64);
        let y = Response::Continuous((0..8).map(|i| 1.0 + 0.5 * i as f64 + (i % 2) as f64).collect());
        let d = Deconfounder::fit(&x, Some(&y), &c).unwrap();
        let r = d.residualize_y(&y, &c).unwrap();
        let back = d
            .restore_y(&DenseMatrix::column_vector(r.values().unwrap()), &c)
            .unwrap();
        for i in 0..8 {
            assert!((back.get(i, 0) - y.values().unwrap()[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_heldout_rows_do_not_affect_fit() {
        let c = DenseMatrix::from_fn(12, 2, |i, j| ((i * (j + 3)) % 7) as f64 + 0.1 * i as f64);
        let x = DenseMatrix::from_fn(12, 3, |i, j| (i as f64).sin() * (j + 1) as f64 + c.get(i, 0));
        let y = Response::Continuous((0..12).map(|i| 0.3 * i as f64 + c.get(i, 1)).collect());
        let train: Vec<usize> = (0..8).collect();
        let test: Vec<usize> = (8..12).collect();
        let c_test = c.select_rows(&test);

        let d = Deconfounder::fit(
            &x.select_rows(&train),
            Some(&y.select(&train)),
            &c.select_rows(&train),
        )
        .unwrap();

        let x_test = x.select_rows(&test);
        let shift = DenseMatrix::from_fn(4, 3, |i, j| (i * 3 + j) as f64 - 2.5);
        let mut x_moved = x_test.clone();
        for i in 0..4 {
            for j in 0..3 {
                x_moved.set(i, j, x_test.get(i, j) + shift.get(i, j));
            }
        }

        let before = d.clone();
        let r0 = d.residualize_x(&x_test, &c_test).unwrap();
        let r1 = d.residualize_x(&x_moved, &c_test).unwrap();
        for i in 0..4 {
            for j in 0..3 {
                assert!((r1.get(i, j) - r0.get(i, j) - shift.get(i, j)).abs() < 1e-10);
            }
        }
        assert_eq!(d.x_coef.max_abs_diff(&before.x_coef), 0.0);
        assert_eq!(d.y_coef, before.y_coef);

        // Held-out rows of the full matrix play no part in the fit
        let mut x_alt = x.clone();
        for i in 8..12 {
            x_alt.set_row(i, &[1e3, -1e3, 5e2]);
        }
        let refit = Deconfounder::fit(
            &x_alt.select_rows(&train),
            Some(&y.select(&train)),
            &c.select_rows(&train),
        )
        .unwrap();
        assert_eq!(refit.x_coef.max_abs_diff(&d.x_coef), 0.0);
        assert_eq!(refit.y_coef, d.y_coef);
    }

    #[test]
    fn test_counts_are_not_deconfounded() {
        let c = confounds();
        let x = DenseMatrix::from_fn(8, 1, |i, _| i as f64 * 0.1);
        let y = Response::Count(vec![1.0; 8]);
        let d = Deconfounder::fit(&x, Some(&y), &c).unwrap();
        assert_eq!(d.residualize_y(&y, &c).unwrap(), y);
    }

    #[test]
    fn test_singular_confounds_are_numerical_error() {
        let c = DenseMatrix::from_fn(8, 2, |i, _| i as f64);
        let x = DenseMatrix::from_fn(8, 1, |i, _| i as f64);
        assert!(matches!(
            Deconfounder::fit(&x, None, &c),
            Err(PredictError::Numerical(_))
        ));
    }
}
