//! Summary statistics and significance for held-out predictions.

use statrs::distribution::{Binomial, ContinuousCDF, DiscreteCDF, StudentsT};

use crate::util::math::{argmax, mean};

/// Pearson correlation. NaN when either input is constant or shorter than 2.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    if a.len() < 2 {
        return f64::NAN;
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - ma, y - mb);
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }
    if saa <= 0.0 || sbb <= 0.0 {
        return f64::NAN;
    }
    sab / (saa * sbb).sqrt()
}

/// Two-sided p-value of a correlation `r` over `n` pairs, from the
/// Student t distribution with n - 2 degrees of freedom.
pub fn correlation_pvalue(r: f64, n: usize) -> f64 {
    if !r.is_finite() || n < 3 {
        return f64::NAN;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// P(X >= k) for X ~ Binomial(n, p0).
pub fn binomial_upper_tail(k: usize, n: usize, p0: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    match Binomial::new(p0.clamp(0.0, 1.0), n as u64) {
        Ok(dist) => (1.0 - dist.cdf((k - 1) as u64)).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Fraction of permutation statistics at or below the reference, which
/// is `stats[0]` and is counted.
pub fn permutation_pvalue(stats: &[f64]) -> f64 {
    match stats.first() {
        Some(&reference) => {
            stats.iter().filter(|&&s| s <= reference).count() as f64 / stats.len() as f64
        }
        None => f64::NAN,
    }
}

/// 1 - dev / nulldev.
pub fn coefficient_of_determination(dev: f64, nulldev: f64) -> f64 {
    1.0 - dev / nulldev
}

/// Most probable class of each row of a probability matrix.
pub fn predicted_labels(probs: &enetcv_linalg::DenseMatrix) -> Vec<usize> {
    (0..probs.nrows()).map(|i| argmax(&probs.row(i))).collect()
}

/// Fraction of matching labels.
pub fn accuracy(labels: &[usize], predicted: &[usize]) -> f64 {
    assert_eq!(labels.len(), predicted.len());
    if labels.is_empty() {
        return f64::NAN;
    }
    labels.iter().zip(predicted).filter(|(a, b)| a == b).count() as f64 / labels.len() as f64
}

/// Proportion of the most frequent class.
pub fn majority_rate(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return f64::NAN;
    }
    counts.iter().copied().max().unwrap_or(0) as f64 / total as f64
}
