//! Response families.
//!
//! A run's family is chosen once from the response it is given and held
//! for the run's lifetime as a boxed [`FamilyAdapter`].

pub mod adapter;
pub mod link;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PredictError, Result};

pub use adapter::{adapter, CoxAdapter, FamilyAdapter, GaussianAdapter, MultinomialAdapter, PoissonAdapter};

/// Most categories a multi-class response may have.
pub const MAX_CLASSES: usize = 9;

/// Response family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Continuous response, identity link.
    Gaussian,
    /// Count response, log link.
    Poisson,
    /// Multi-class response, multinomial logit.
    Multinomial,
    /// Right-censored survival response, Cox proportional hazards.
    Cox,
}

impl FromStr for Family {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gaussian" | "continuous" => Ok(Family::Gaussian),
            "poisson" | "count" => Ok(Family::Poisson),
            "multinomial" | "multiclass" => Ok(Family::Multinomial),
            "cox" | "survival" => Ok(Family::Cox),
            _ => Err(PredictError::Configuration(format!("unknown family: {}", s))),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Gaussian => "gaussian",
            Family::Poisson => "poisson",
            Family::Multinomial => "multinomial",
            Family::Cox => "cox",
        };
        f.write_str(name)
    }
}

/// Response values for every sample, shaped by family.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Continuous(Vec<f64>),
    Count(Vec<f64>),
    /// Class labels in `0..n_classes`.
    Classes { labels: Vec<usize>, n_classes: usize },
    /// Event or censoring time, and whether the event was observed.
    Survival { time: Vec<f64>, status: Vec<bool> },
}

impl Response {
    /// Build a multi-class response, checking labels and the class limit.
    pub fn classes(labels: Vec<usize>, n_classes: usize) -> Result<Self> {
        if n_classes < 2 {
            return Err(PredictError::Configuration(format!(
                "a multi-class response needs at least 2 classes, got {}",
                n_classes
            )));
        }
        if n_classes > MAX_CLASSES {
            return Err(PredictError::Configuration(format!(
                "{} classes requested, at most {} are supported",
                n_classes, MAX_CLASSES
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(PredictError::InvalidInput(format!(
                "class label {} out of range for {} classes",
                bad, n_classes
            )));
        }
        Ok(Response::Classes { labels, n_classes })
    }

    /// Build a survival response, checking lengths and times.
    pub fn survival(time: Vec<f64>, status: Vec<bool>) -> Result<Self> {
        if time.len() != status.len() {
            return Err(PredictError::DimensionMismatch {
                what: "survival status",
                expected: time.len(),
                got: status.len(),
            });
        }
        if time.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(PredictError::InvalidInput(
                "survival times must be finite and non-negative".into(),
            ));
        }
        Ok(Response::Survival { time, status })
    }

    pub fn family(&self) -> Family {
        match self {
            Response::Continuous(_) => Family::Gaussian,
            Response::Count(_) => Family::Poisson,
            Response::Classes { .. } => Family::Multinomial,
            Response::Survival { .. } => Family::Cox,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Response::Continuous(v) | Response::Count(v) => v.len(),
            Response::Classes { labels, .. } => labels.len(),
            Response::Survival { time, .. } => time.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of prediction columns: classes for multinomial, else 1.
    pub fn n_outputs(&self) -> usize {
        match self {
            Response::Classes { n_classes, .. } => *n_classes,
            _ => 1,
        }
    }

    /// The scalar values of a continuous or count response.
    pub fn values(&self) -> Option<&[f64]> {
        match self {
            Response::Continuous(v) | Response::Count(v) => Some(v),
            _ => None,
        }
    }

    /// Class labels of a multi-class response.
    pub fn labels(&self) -> Option<&[usize]> {
        match self {
            Response::Classes { labels, .. } => Some(labels),
            _ => None,
        }
    }

    /// Response restricted to `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Response {
        match self {
            Response::Continuous(v) => Response::Continuous(indices.iter().map(|&i| v[i]).collect()),
            Response::Count(v) => Response::Count(indices.iter().map(|&i| v[i]).collect()),
            Response::Classes { labels, n_classes } => Response::Classes {
                labels: indices.iter().map(|&i| labels[i]).collect(),
                n_classes: *n_classes,
            },
            Response::Survival { time, status } => Response::Survival {
                time: indices.iter().map(|&i| time[i]).collect(),
                status: indices.iter().map(|&i| status[i]).collect(),
            },
        }
    }

    /// Relabel: sample `i` receives the response of sample `permutation[i]`.
    pub fn permuted(&self, permutation: &[usize]) -> Response {
        assert_eq!(permutation.len(), self.len());
        self.select(permutation)
    }

    /// Class counts of a multi-class response.
    pub fn class_counts(&self) -> Option<Vec<usize>> {
        self.labels().map(|labels| {
            let mut counts = vec![0usize; self.n_outputs()];
            for &l in labels {
                counts[l] += 1;
            }
            counts
        })
    }
}
