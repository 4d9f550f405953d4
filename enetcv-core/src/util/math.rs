//! Mathematical utility functions.
//!
//! Deviances take logarithms of predicted means and probabilities that
//! can underflow to zero; all of them go through `safe_log` and `xlogy`.

/// Smallest argument `safe_log` will take the logarithm of.
pub const LOG_FLOOR: f64 = 1e-300;

/// Natural log with the argument clamped to `LOG_FLOOR`.
pub fn safe_log(x: f64) -> f64 {
    x.max(LOG_FLOOR).ln()
}

/// `x * ln(y)`, defined as 0 when `x == 0` whatever `y` is.
pub fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * safe_log(y)
    }
}

/// Safe division: returns 0 if denominator is near zero.
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() > 1e-30 {
        num / den
    } else {
        0.0
    }
}

/// Soft-thresholding operator S(z, g) = sign(z) * max(|z| - g, 0).
pub fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population variance (divides by n).
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Numerically stable softmax.
pub fn softmax(eta: &[f64]) -> Vec<f64> {
    let max = eta.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = eta.iter().map(|&e| (e - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xlogy_zero_convention() {
        assert_eq!(xlogy(0.0, 0.0), 0.0);
        assert_eq!(xlogy(0.0, 5.0), 0.0);
        assert!((xlogy(2.0, std::f64::consts::E) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_safe_log_is_finite_at_zero() {
        assert!(safe_log(0.0).is_finite());
        assert!(safe_log(-1.0).is_finite());
        assert!((safe_log(1.0)).abs() < 1e-15);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 2.0), 0.5);
        assert_eq!(safe_div(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1000.0, 1001.0, 999.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&p), 1);
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
    }
}
