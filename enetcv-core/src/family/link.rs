//! Link functions.
//!
//! Maps between the linear predictor (eta) and the mean (mu).

/// Link function interface.
pub trait LinkFunction {
    /// Apply the link function: eta = g(mu).
    fn link(&self, mu: f64) -> f64;
    /// Apply the inverse link: mu = g^{-1}(eta).
    fn inv_link(&self, eta: f64) -> f64;
}

/// Identity link for continuous responses.
#[derive(Debug, Clone, Copy)]
pub struct IdentityLink;

impl LinkFunction for IdentityLink {
    fn link(&self, mu: f64) -> f64 {
        mu
    }

    fn inv_link(&self, eta: f64) -> f64 {
        eta
    }
}

/// Log link for counts and relative risks.
#[derive(Debug, Clone, Copy)]
pub struct LogLink;

impl LogLink {
    /// Linear predictors are clamped here before exponentiation.
    pub const ETA_MAX: f64 = 50.0;
}

impl LinkFunction for LogLink {
    fn link(&self, mu: f64) -> f64 {
        crate::util::math::safe_log(mu)
    }

    fn inv_link(&self, eta: f64) -> f64 {
        eta.clamp(-Self::ETA_MAX, Self::ETA_MAX).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let link = IdentityLink;
        assert_eq!(link.link(5.0), 5.0);
        assert_eq!(link.inv_link(5.0), 5.0);
    }

    #[test]
    fn test_log_round_trip() {
        let link = LogLink;
        for &mu in &[0.1, 1.0, 7.5] {
            assert!((link.inv_link(link.link(mu)) - mu).abs() < 1e-12);
        }
        assert!(link.inv_link(1e6).is_finite());
    }
}
