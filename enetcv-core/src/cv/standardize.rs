//! Per-column standardization with recorded parameters.

use enetcv_linalg::DenseMatrix;

use crate::util::math::{mean, variance};

/// Column means and scales fitted on one set of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    /// Zero-variance columns get scale 1.
    pub fn fit(x: &DenseMatrix) -> Self {
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        for j in 0..x.ncols() {
            let col = x.col(j);
            let sd = variance(&col).sqrt();
            means.push(mean(&col));
            scales.push(if sd > 1e-12 { sd } else { 1.0 });
        }
        Self { means, scales }
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn apply(&self, x: &DenseMatrix) -> DenseMatrix {
        assert_eq!(x.ncols(), self.means.len());
        DenseMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x.get(i, j) - self.means[j]) / self.scales[j]
        })
    }

    pub fn inverse(&self, z: &DenseMatrix) -> DenseMatrix {
        assert_eq!(z.ncols(), self.means.len());
        DenseMatrix::from_fn(z.nrows(), z.ncols(), |i, j| {
            z.get(i, j) * self.scales[j] + self.means[j]
        })
    }
}
