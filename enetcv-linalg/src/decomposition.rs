#![allow(clippy::needless_range_loop)]
//! Matrix decompositions and least-squares solvers.
//!
//! Confound regression fits every feature column (and the response) on
//! the same confound design, so the QR factor is computed once and
//! reused for all right-hand sides.

use crate::dense::DenseMatrix;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("Singular matrix encountered (column {column} is linearly dependent)")]
    SingularMatrix { column: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Underdetermined system: {nrows} rows for {ncols} columns")]
    Underdetermined { nrows: usize, ncols: usize },
}

/// Thin QR decomposition A = Q * R of a tall matrix.
pub struct QrDecomp {
    pub q: DenseMatrix,
    pub r: DenseMatrix,
}

impl QrDecomp {
    /// Relative tolerance below which a column counts as dependent.
    const RANK_TOL: f64 = 1e-10;

    /// Compute the thin QR decomposition of an m x n matrix (m >= n).
    ///
    /// Modified Gram-Schmidt with one re-orthogonalisation pass, which is
    /// plenty for the handful of confound columns it is used on.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let m = a.nrows();
        let n = a.ncols();
        if m < n {
            return Err(LinalgError::Underdetermined { nrows: m, ncols: n });
        }

        let mut q = DenseMatrix::zeros(m, n);
        let mut r = DenseMatrix::zeros(n, n);
        let mut cols = a.columns();

        for j in 0..n {
            let original_norm = DenseMatrix::dot(&cols[j], &cols[j]).sqrt();
            for _pass in 0..2 {
                for i in 0..j {
                    let q_col = q.col(i);
                    let rij = DenseMatrix::dot(&q_col, &cols[j]);
                    r.set(i, j, r.get(i, j) + rij);
                    for k in 0..m {
                        cols[j][k] -= rij * q_col[k];
                    }
                }
            }

            let norm = DenseMatrix::dot(&cols[j], &cols[j]).sqrt();
            if norm <= Self::RANK_TOL * original_norm.max(1.0) {
                return Err(LinalgError::SingularMatrix { column: j });
            }
            r.set(j, j, norm);
            for k in 0..m {
                q.set(k, j, cols[j][k] / norm);
            }
        }

        Ok(QrDecomp { q, r })
    }

    /// Solve R * x = Q' * b (least squares for a single right-hand side).
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.r.nrows();
        let qtb = self.q.transpose().mat_vec(b);

        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += self.r.get(i, j) * x[j];
            }
            x[i] = (qtb[i] - sum) / self.r.get(i, i);
        }
        x
    }

    /// Least-squares solution for every column of `b`; returns n x b.ncols().
    pub fn solve_matrix(&self, b: &DenseMatrix) -> DenseMatrix {
        let n = self.r.nrows();
        let mut out = DenseMatrix::zeros(n, b.ncols());
        for j in 0..b.ncols() {
            out.set_col(j, &self.solve(&b.col(j)));
        }
        out
    }
}

/// Least-squares coefficients B minimising ||A B - Y|| column by column.
pub fn least_squares(a: &DenseMatrix, y: &DenseMatrix) -> Result<DenseMatrix, LinalgError> {
    if a.nrows() != y.nrows() {
        return Err(LinalgError::DimensionMismatch {
            expected: a.nrows(),
            got: y.nrows(),
        });
    }
    let qr = QrDecomp::new(a)?;
    Ok(qr.solve_matrix(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_orthogonal() {
        let a = DenseMatrix::from_row_major(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let qr = QrDecomp::new(&a).unwrap();
        let qtq = qr.q.transpose().mat_mul(&qr.q);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((qtq.get(i, j) - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_least_squares_exact_fit() {
        // y0 = 1 + 2 t, y1 = -3 t
        let t = [0.0, 1.0, 2.0, 3.0];
        let a = DenseMatrix::from_fn(4, 2, |i, j| if j == 0 { 1.0 } else { t[i] });
        let y = DenseMatrix::from_fn(4, 2, |i, j| if j == 0 { 1.0 + 2.0 * t[i] } else { -3.0 * t[i] });
        let b = least_squares(&a, &y).unwrap();
        assert!((b.get(0, 0) - 1.0).abs() < 1e-10);
        assert!((b.get(1, 0) - 2.0).abs() < 1e-10);
        assert!(b.get(0, 1).abs() < 1e-10);
        assert!((b.get(1, 1) + 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_least_squares_collinear_is_singular() {
        let a = DenseMatrix::from_fn(4, 2, |i, _| i as f64 + 1.0);
        let y = DenseMatrix::zeros(4, 1);
        assert!(matches!(
            least_squares(&a, &y),
            Err(LinalgError::SingularMatrix { column: 1 })
        ));
    }

    #[test]
    fn test_underdetermined() {
        let a = DenseMatrix::zeros(1, 3);
        assert!(matches!(
            QrDecomp::new(&a),
            Err(LinalgError::Underdetermined { .. })
        ));
    }
}
