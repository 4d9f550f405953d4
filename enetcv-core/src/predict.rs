//! Run orchestration.
//!
//! Every permutation relabels the response, runs the outer loop and
//! records the held-out deviance. The unpermuted first pass also yields
//! the reported predictions and statistics. Permutations run in order,
//! each drawing from its own ChaCha stream of the configured seed, so a
//! run is reproducible regardless of thread count.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use enetcv_linalg::DenseMatrix;

use crate::config::PredictConfig;
use crate::cv::outer::{run_outer_loop, FoldSummary, OuterInputs, OuterResult};
use crate::cv::permutation::{DependencyStructure, PermutationEngine};
use crate::cv::selection::Selector;
use crate::error::{PredictError, Result};
use crate::family::{adapter, Family, FamilyAdapter, Response};
use crate::solver::{CoordinateDescent, PathSolver, SolverScope};
use crate::stats;
use crate::util::math::safe_log;

/// Data for a prediction run.
#[derive(Debug, Clone)]
pub struct PredictionInputs {
    /// N x p features.
    pub x: DenseMatrix,
    pub y: Response,
    /// N x q confounds, removed from features (and a continuous response)
    /// within each training fold.
    pub confounds: Option<DenseMatrix>,
    pub structure: Option<DependencyStructure>,
    /// Pre-supplied permutations, one source-index column per pass.
    pub permutations: Option<Vec<Vec<usize>>>,
}

/// Statistics of a run. Deconfounded-space fields are set when
/// confounds were given.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionStats {
    pub family: Family,
    /// Permutation p-value when more than one permutation ran, otherwise
    /// the parametric p-value.
    pub pval: f64,
    pub pval_parametric: f64,
    pub dev: f64,
    pub nulldev: f64,
    pub cod: f64,
    pub accuracy: Option<f64>,
    pub dev_deconf: Option<f64>,
    pub nulldev_deconf: Option<f64>,
    pub cod_deconf: Option<f64>,
    pub pval_deconf: Option<f64>,
    pub n_perm: usize,
    /// Held-out deviance of every permutation, the reference first.
    pub perm_stats: Vec<f64>,
}

/// Everything a run returns.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    /// Held-out predictions in the original response space, N x k.
    pub predictions: DenseMatrix,
    pub predictions_deconf: Option<DenseMatrix>,
    /// Most probable class per sample (multi-class only).
    pub predicted_labels: Option<Vec<usize>>,
    pub stats: PredictionStats,
    /// Selections of the reference pass.
    pub folds: Vec<FoldSummary>,
}

/// Run with the built-in coordinate-descent solver.
pub fn run_prediction(inputs: &PredictionInputs, config: &PredictConfig) -> Result<PredictionOutcome> {
    let solver = CoordinateDescent::new(config.solver.clone());
    run_prediction_with(&solver, inputs, config)
}

/// Run with any path solver.
pub fn run_prediction_with(
    solver: &dyn PathSolver,
    inputs: &PredictionInputs,
    config: &PredictConfig,
) -> Result<PredictionOutcome> {
    let n = inputs.y.len();
    check_inputs(inputs)?;
    config.validate(n)?;
    if config.show_scatter {
        debug!("Scatter plots are not supported; show_scatter ignored");
    }

    let family = adapter(inputs.y.family());
    let pairs = inputs
        .structure
        .as_ref()
        .map(|s| s.all_pairs())
        .unwrap_or_default();
    let engine = PermutationEngine::new(
        n,
        config.n_perm,
        inputs.structure.clone(),
        inputs.permutations.clone(),
    )?;

    info!(
        "Predicting {} response: {} samples, {} features, {} permutation(s) ({:?})",
        family.family(),
        n,
        inputs.x.ncols(),
        engine.n_perm(),
        engine.mode()
    );

    let scope = SolverScope::open(solver)?;
    let selector = Selector {
        scope: &scope,
        family: family.as_ref(),
        config,
    };

    let mut perm_stats = Vec::with_capacity(engine.n_perm());
    let mut reference: Option<OuterResult> = None;

    for index in 0..engine.n_perm() {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        rng.set_stream(index as u64);

        let perm = engine.permutation(index, &mut rng)?;
        let y = inputs.y.permuted(&perm);
        let outer = run_outer_loop(
            &selector,
            &OuterInputs {
                x: &inputs.x,
                y: &y,
                confounds: inputs.confounds.as_ref(),
                pairs: &pairs,
                compute_null: index == 0,
            },
            &mut rng,
        )?;

        let stat = finite(family.deviance(&y, &outer.predictions), "held-out deviance")?;
        info!("Permutation {}/{}: deviance {:.6}", index + 1, engine.n_perm(), stat);
        perm_stats.push(stat);
        if index == 0 {
            reference = Some(outer);
        }
    }

    let reference =
        reference.ok_or_else(|| PredictError::Configuration("no permutations were run".into()))?;
    let stats = summarize(family.as_ref(), &inputs.y, &reference, perm_stats)?;
    info!(
        "dev={:.4} nulldev={:.4} cod={:.4} pval={:.4e} ({} solver fits)",
        stats.dev,
        stats.nulldev,
        stats.cod,
        stats.pval,
        scope.n_fits()
    );

    let predicted_labels = (family.family() == Family::Multinomial)
        .then(|| stats::predicted_labels(&reference.predictions));

    Ok(PredictionOutcome {
        predictions: reference.predictions,
        predictions_deconf: reference.deconfounded.map(|d| d.predictions),
        predicted_labels,
        stats,
        folds: reference.folds,
    })
}

fn check_inputs(inputs: &PredictionInputs) -> Result<()> {
    let n = inputs.y.len();
    if n == 0 {
        return Err(PredictError::InvalidInput("the response is empty".into()));
    }
    if inputs.x.nrows() != n {
        return Err(PredictError::DimensionMismatch {
            what: "feature rows",
            expected: n,
            got: inputs.x.nrows(),
        });
    }
    if !inputs.x.all_finite() {
        return Err(PredictError::InvalidInput("features contain non-finite values".into()));
    }
    if let Some(c) = &inputs.confounds {
        if c.nrows() != n {
            return Err(PredictError::DimensionMismatch {
                what: "confound rows",
                expected: n,
                got: c.nrows(),
            });
        }
    }
    if let Some(v) = inputs.y.values() {
        if v.iter().any(|y| !y.is_finite()) {
            return Err(PredictError::InvalidInput("response contains non-finite values".into()));
        }
    }
    Ok(())
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictError::Numerical(format!("{} is not finite", what)))
    }
}

/// Parametric significance of held-out predictions.
fn parametric_pvalue(y: &Response, predictions: &DenseMatrix) -> f64 {
    match y {
        Response::Continuous(v) | Response::Count(v) => {
            stats::correlation_pvalue(stats::pearson(v, &predictions.col(0)), v.len())
        }
        Response::Classes { labels, .. } => {
            let predicted = stats::predicted_labels(predictions);
            let correct = labels.iter().zip(&predicted).filter(|(a, b)| a == b).count();
            let chance = y
                .class_counts()
                .map(|c| stats::majority_rate(&c))
                .unwrap_or(f64::NAN);
            stats::binomial_upper_tail(correct, labels.len(), chance)
        }
        Response::Survival { time, status } => {
            let (risk, neg_time): (Vec<f64>, Vec<f64>) = (0..time.len())
                .filter(|&i| status[i])
                .map(|i| (safe_log(predictions.get(i, 0)), -time[i]))
                .unzip();
            stats::correlation_pvalue(stats::pearson(&risk, &neg_time), risk.len())
        }
    }
}

fn summarize(
    family: &dyn FamilyAdapter,
    y: &Response,
    reference: &OuterResult,
    perm_stats: Vec<f64>,
) -> Result<PredictionStats> {
    let dev = finite(family.deviance(y, &reference.predictions), "deviance")?;
    let nulldev = match &reference.null_predictions {
        Some(null) => finite(family.null_deviance(y, null), "null deviance")?,
        None => f64::NAN,
    };
    let accuracy = y
        .labels()
        .map(|labels| stats::accuracy(labels, &stats::predicted_labels(&reference.predictions)));

    let pval_parametric = parametric_pvalue(y, &reference.predictions);
    let pval = if perm_stats.len() > 1 {
        stats::permutation_pvalue(&perm_stats)
    } else {
        pval_parametric
    };

    let (mut dev_deconf, mut nulldev_deconf, mut cod_deconf, mut pval_deconf) = (None, None, None, None);
    if let Some(d) = &reference.deconfounded {
        let dd = finite(family.deviance(&d.response, &d.predictions), "deconfounded deviance")?;
        if let Some(null) = &d.null_predictions {
            let nd = finite(family.null_deviance(&d.response, null), "deconfounded null deviance")?;
            nulldev_deconf = Some(nd);
            cod_deconf = Some(stats::coefficient_of_determination(dd, nd));
        }
        dev_deconf = Some(dd);
        pval_deconf = Some(parametric_pvalue(&d.response, &d.predictions));
    }

    Ok(PredictionStats {
        family: family.family(),
        pval,
        pval_parametric,
        dev,
        nulldev,
        cod: stats::coefficient_of_determination(dev, nulldev),
        accuracy,
        dev_deconf,
        nulldev_deconf,
        cod_deconf,
        pval_deconf,
        n_perm: perm_stats.len(),
        perm_stats,
    })
}
