#![allow(clippy::needless_range_loop)]
//! Coordinate-descent elastic-net path solver.
//!
//! Minimises, for each lambda on the path,
//!
//!   -(1/n) loglik(beta) + lambda * (alpha * |beta|_1 + (1 - alpha)/2 * |beta|_2^2)
//!
//! by cyclic coordinate descent on the penalised weighted least-squares
//! approximation of the log-likelihood. Gaussian fits solve that problem
//! directly; Poisson, multinomial and Cox fits wrap it in IRLS
//! (multinomial one class at a time, Cox with the diagonal of the Breslow
//! partial-likelihood Hessian). Each lambda warm-starts from the previous.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::trace;

use enetcv_linalg::DenseMatrix;

use super::{FitPath, LambdaPath, LinearModel, PathOptions, PathSolver, ZERO_TOL};
use crate::error::{PredictError, Result};
use crate::family::link::LogLink;
use crate::family::{adapter, Response};
use crate::util::math::{mean, safe_div, soft_threshold, softmax};

/// Smallest IRLS working weight for multinomial fits.
const MIN_PROB_WEIGHT: f64 = 1e-5;
/// Stop an automatic path once this fraction of null deviance is explained.
const MAX_DEV_RATIO: f64 = 0.999;

/// Convergence settings of the coordinate-descent solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum coordinate sweeps per weighted least-squares problem.
    pub max_sweeps: usize,
    /// Maximum IRLS iterations per lambda.
    pub max_irls_iter: usize,
    /// Sweep convergence: largest weighted squared coefficient change.
    pub tol: f64,
    /// IRLS convergence: largest absolute coefficient change.
    pub irls_tol: f64,
    /// lambda_min / lambda_max for automatic paths. Defaults to 1e-4 when
    /// n > p and 1e-2 otherwise.
    pub min_lambda_ratio: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_sweeps: 1000,
            max_irls_iter: 50,
            tol: 1e-9,
            irls_tol: 1e-6,
            min_lambda_ratio: None,
        }
    }
}

/// In-process elastic-net path solver.
#[derive(Debug, Clone, Default)]
pub struct CoordinateDescent {
    config: SolverConfig,
}

impl CoordinateDescent {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// Design columns as seen by the sweeps, with the transform needed to
/// return coefficients on the caller's scale.
struct Design {
    cols: Vec<Vec<f64>>,
    means: Vec<f64>,
    scales: Vec<f64>,
    excluded: Vec<bool>,
    n: usize,
}

impl Design {
    fn new(x: &DenseMatrix, standardize: bool, intercept: bool) -> Self {
        let n = x.nrows();
        let mut cols = x.columns();
        let p = cols.len();
        let mut means = vec![0.0; p];
        let mut scales = vec![1.0; p];
        let mut excluded = vec![false; p];

        for j in 0..p {
            let m = mean(&cols[j]);
            let sd = (cols[j].iter().map(|v| (v - m).powi(2)).sum::<f64>() / n.max(1) as f64).sqrt();
            let all_zero = cols[j].iter().all(|v| *v == 0.0);
            // Constant columns are aliased with the intercept
            if all_zero || (intercept && sd <= 1e-12 * m.abs().max(1.0)) {
                excluded[j] = true;
                continue;
            }
            if standardize {
                if intercept {
                    means[j] = m;
                }
                scales[j] = sd;
                for v in cols[j].iter_mut() {
                    *v = (*v - means[j]) / sd;
                }
            }
        }

        Self {
            cols,
            means,
            scales,
            excluded,
            n,
        }
    }

    fn p(&self) -> usize {
        self.cols.len()
    }

    fn eta(&self, beta: &[f64], b0: f64) -> Vec<f64> {
        let mut eta = vec![b0; self.n];
        for j in 0..self.p() {
            if beta[j] == 0.0 {
                continue;
            }
            for i in 0..self.n {
                eta[i] += self.cols[j][i] * beta[j];
            }
        }
        eta
    }

    /// max_j |x_j' s| / n over all score vectors.
    fn max_score(&self, scores: &[Vec<f64>]) -> f64 {
        let mut best = 0.0f64;
        for j in 0..self.p() {
            if self.excluded[j] {
                continue;
            }
            for s in scores {
                let g: f64 = self.cols[j].iter().zip(s.iter()).map(|(x, si)| x * si).sum();
                best = best.max(g.abs() / self.n as f64);
            }
        }
        best
    }

    /// Map sweep-space coefficients back to the caller's scale.
    fn to_model(&self, beta: &[Vec<f64>], b0: &[f64], keep_intercept: bool) -> LinearModel {
        let k = beta.len();
        let mut model = LinearModel::zeros(self.p(), k);
        for c in 0..k {
            let mut intercept = b0[c];
            for j in 0..self.p() {
                if self.excluded[j] {
                    continue;
                }
                let b = beta[c][j] / self.scales[j];
                model.coefficients.set(j, c, b);
                intercept -= b * self.means[j];
            }
            model.intercept[c] = if keep_intercept { intercept } else { 0.0 };
        }
        model
    }
}

/// One penalised weighted least-squares problem.
struct Subproblem<'a> {
    w: &'a [f64],
    z: &'a [f64],
    lambda: f64,
    alpha: f64,
    intercept: bool,
}

impl CoordinateDescent {
    /// Cyclic coordinate descent on
    /// (1/2) sum_i w_i (z_i - b0 - x_i'beta)^2 + penalty.
    fn sweep(&self, design: &Design, sub: &Subproblem<'_>, beta: &mut [f64], b0: &mut f64) -> usize {
        let n = design.n;
        let p = design.p();
        let l1 = sub.lambda * sub.alpha;
        let l2 = sub.lambda * (1.0 - sub.alpha);

        let eta = design.eta(beta, *b0);
        let mut r: Vec<f64> = (0..n).map(|i| sub.z[i] - eta[i]).collect();
        let sw: f64 = sub.w.iter().sum();
        let xw2: Vec<f64> = (0..p)
            .map(|j| {
                if design.excluded[j] {
                    0.0
                } else {
                    (0..n).map(|i| sub.w[i] * design.cols[j][i].powi(2)).sum()
                }
            })
            .collect();

        for sweep in 0..self.config.max_sweeps {
            let mut max_delta = 0.0f64;

            if sub.intercept && sw > 0.0 {
                let d: f64 = (0..n).map(|i| sub.w[i] * r[i]).sum::<f64>() / sw;
                if d != 0.0 {
                    *b0 += d;
                    r.iter_mut().for_each(|ri| *ri -= d);
                    max_delta = max_delta.max(d * d * sw);
                }
            }

            for j in 0..p {
                if xw2[j] <= 0.0 {
                    continue;
                }
                let col = &design.cols[j];
                let old = beta[j];
                let g: f64 = (0..n).map(|i| sub.w[i] * col[i] * r[i]).sum::<f64>() + xw2[j] * old;
                let new = soft_threshold(g, l1) / (xw2[j] + l2);
                if new != old {
                    let diff = new - old;
                    for i in 0..n {
                        r[i] -= col[i] * diff;
                    }
                    beta[j] = new;
                    max_delta = max_delta.max(diff * diff * xw2[j]);
                }
            }

            if max_delta < self.config.tol {
                return sweep + 1;
            }
        }
        self.config.max_sweeps
    }
}

fn max_change(old_beta: &[Vec<f64>], beta: &[Vec<f64>], old_b0: &[f64], b0: &[f64]) -> f64 {
    let mut m = 0.0f64;
    for (ob, b) in old_beta.iter().zip(beta.iter()) {
        for (x, y) in ob.iter().zip(b.iter()) {
            m = m.max((x - y).abs());
        }
    }
    for (x, y) in old_b0.iter().zip(b0.iter()) {
        m = m.max((x - y).abs());
    }
    m
}

fn exp_eta(eta: f64) -> f64 {
    eta.clamp(-LogLink::ETA_MAX, LogLink::ETA_MAX).exp()
}

/// Gradient and diagonal Hessian (negated) of the Breslow log partial
/// likelihood with respect to eta. `order` sorts samples by ascending time.
fn cox_derivatives(eta: &[f64], time: &[f64], status: &[bool], order: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let n = eta.len();
    let r: Vec<f64> = eta.iter().map(|&e| exp_eta(e)).collect();

    // Risk-set sums: everything at or after each tied time
    let mut risk = vec![0.0; n];
    let mut acc = 0.0;
    let mut end = n;
    while end > 0 {
        let t = time[order[end - 1]];
        let mut start = end - 1;
        while start > 0 && time[order[start - 1]] == t {
            start -= 1;
        }
        for &i in &order[start..end] {
            acc += r[i];
        }
        for &i in &order[start..end] {
            risk[i] = acc;
        }
        end = start;
    }

    // Failures at or before each tied time
    let mut a = vec![0.0; n];
    let mut b = vec![0.0; n];
    let (mut ca, mut cb) = (0.0, 0.0);
    let mut start = 0;
    while start < n {
        let t = time[order[start]];
        let mut end = start + 1;
        while end < n && time[order[end]] == t {
            end += 1;
        }
        for &i in &order[start..end] {
            if status[i] {
                ca += 1.0 / risk[i];
                cb += 1.0 / (risk[i] * risk[i]);
            }
        }
        for &i in &order[start..end] {
            a[i] = ca;
            b[i] = cb;
        }
        start = end;
    }

    let grad = (0..n)
        .map(|i| (if status[i] { 1.0 } else { 0.0 }) - r[i] * a[i])
        .collect();
    let hess = (0..n).map(|i| (r[i] * a[i] - r[i] * r[i] * b[i]).max(0.0)).collect();
    (grad, hess)
}

/// Family-specific pieces of the path algorithm.
enum Objective<'a> {
    Gaussian(&'a [f64]),
    Poisson(&'a [f64]),
    Multinomial(Vec<Vec<f64>>),
    Cox {
        time: &'a [f64],
        status: &'a [bool],
        order: Vec<usize>,
    },
}

impl<'a> Objective<'a> {
    fn new(y: &'a Response) -> Result<Self> {
        Ok(match y {
            Response::Continuous(v) => Objective::Gaussian(v),
            Response::Count(v) => {
                if v.iter().any(|c| *c < 0.0 || !c.is_finite()) {
                    return Err(PredictError::InvalidInput("counts must be finite and non-negative".into()));
                }
                Objective::Poisson(v)
            }
            Response::Classes { labels, n_classes } => Objective::Multinomial(
                (0..*n_classes)
                    .map(|k| labels.iter().map(|&l| if l == k { 1.0 } else { 0.0 }).collect())
                    .collect(),
            ),
            Response::Survival { time, status } => {
                let mut order: Vec<usize> = (0..time.len()).collect();
                order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
                Objective::Cox { time, status, order }
            }
        })
    }

    fn n_outputs(&self) -> usize {
        match self {
            Objective::Multinomial(y) => y.len(),
            _ => 1,
        }
    }

    fn has_intercept(&self, requested: bool) -> bool {
        requested && !matches!(self, Objective::Cox { .. })
    }

    fn initial_intercepts(&self, intercept: bool) -> Vec<f64> {
        if !intercept {
            return vec![0.0; self.n_outputs()];
        }
        match self {
            Objective::Gaussian(y) => vec![mean(y)],
            Objective::Poisson(y) => vec![mean(y).max(1e-10).ln()],
            Objective::Multinomial(y) => y.iter().map(|yk| mean(yk).max(1e-10).ln()).collect(),
            Objective::Cox { .. } => vec![0.0],
        }
    }

    /// Score vectors (d loglik / d eta) at the intercept-only model.
    fn null_scores(&self, b0: &[f64]) -> Vec<Vec<f64>> {
        match self {
            Objective::Gaussian(y) => vec![y.iter().map(|v| v - b0[0]).collect()],
            Objective::Poisson(y) => {
                let mu = exp_eta(b0[0]);
                vec![y.iter().map(|v| v - mu).collect()]
            }
            Objective::Multinomial(y) => {
                let p = softmax(b0);
                y.iter()
                    .enumerate()
                    .map(|(k, yk)| yk.iter().map(|v| v - p[k]).collect())
                    .collect()
            }
            Objective::Cox { time, status, order } => {
                let eta = vec![0.0; time.len()];
                vec![cox_derivatives(&eta, time, status, order).0]
            }
        }
    }
}

impl CoordinateDescent {
    /// Solve at one lambda, updating `beta` and `b0` in place.
    fn solve_lambda(
        &self,
        objective: &Objective<'_>,
        design: &Design,
        lambda: f64,
        alpha: f64,
        intercept: bool,
        beta: &mut [Vec<f64>],
        b0: &mut [f64],
    ) {
        let n = design.n;
        let nf = n as f64;
        match objective {
            Objective::Gaussian(y) => {
                let w = vec![1.0 / nf; n];
                let sub = Subproblem { w: &w, z: y, lambda, alpha, intercept };
                self.sweep(design, &sub, &mut beta[0], &mut b0[0]);
            }
            Objective::Poisson(y) => {
                for _ in 0..self.config.max_irls_iter {
                    let (old_beta, old_b0) = (beta.to_vec(), b0.to_vec());
                    let eta = design.eta(&beta[0], b0[0]);
                    let mu: Vec<f64> = eta.iter().map(|&e| exp_eta(e)).collect();
                    let w: Vec<f64> = mu.iter().map(|m| m / nf).collect();
                    let z: Vec<f64> = (0..n).map(|i| eta[i] + safe_div(y[i] - mu[i], mu[i])).collect();
                    let sub = Subproblem { w: &w, z: &z, lambda, alpha, intercept };
                    self.sweep(design, &sub, &mut beta[0], &mut b0[0]);
                    if max_change(&old_beta, beta, &old_b0, b0) < self.config.irls_tol {
                        break;
                    }
                }
            }
            Objective::Multinomial(y) => {
                let k_classes = y.len();
                for _ in 0..self.config.max_irls_iter {
                    let (old_beta, old_b0) = (beta.to_vec(), b0.to_vec());
                    for k in 0..k_classes {
                        let etas: Vec<Vec<f64>> =
                            (0..k_classes).map(|c| design.eta(&beta[c], b0[c])).collect();
                        let mut w = vec![0.0; n];
                        let mut z = vec![0.0; n];
                        for i in 0..n {
                            let row: Vec<f64> = etas.iter().map(|e| e[i]).collect();
                            let pk = softmax(&row)[k];
                            let v = (pk * (1.0 - pk)).max(MIN_PROB_WEIGHT);
                            w[i] = v / nf;
                            z[i] = etas[k][i] + (y[k][i] - pk) / v;
                        }
                        let sub = Subproblem { w: &w, z: &z, lambda, alpha, intercept };
                        self.sweep(design, &sub, &mut beta[k], &mut b0[k]);
                    }
                    if max_change(&old_beta, beta, &old_b0, b0) < self.config.irls_tol {
                        break;
                    }
                }
            }
            Objective::Cox { time, status, order } => {
                for _ in 0..self.config.max_irls_iter {
                    let (old_beta, old_b0) = (beta.to_vec(), b0.to_vec());
                    let eta = design.eta(&beta[0], 0.0);
                    let (grad, hess) = cox_derivatives(&eta, time, status, order);
                    let mut w = vec![0.0; n];
                    let mut z = eta.clone();
                    for i in 0..n {
                        if hess[i] > 1e-12 {
                            w[i] = hess[i] / nf;
                            z[i] += grad[i] / hess[i];
                        }
                    }
                    let sub = Subproblem { w: &w, z: &z, lambda, alpha, intercept: false };
                    self.sweep(design, &sub, &mut beta[0], &mut b0[0]);
                    if max_change(&old_beta, beta, &old_b0, b0) < self.config.irls_tol {
                        break;
                    }
                }
            }
        }
    }

    fn lambda_sequence(&self, options: &PathOptions, lambda_max: f64, n: usize, p: usize) -> Result<Vec<f64>> {
        match &options.lambda {
            LambdaPath::Auto { nlambda } => {
                if *nlambda == 0 {
                    return Err(PredictError::InvalidInput("nlambda must be at least 1".into()));
                }
                if *nlambda == 1 {
                    return Ok(vec![lambda_max]);
                }
                let ratio = self
                    .config
                    .min_lambda_ratio
                    .unwrap_or(if n > p { 1e-4 } else { 1e-2 });
                let step = ratio.ln() / (*nlambda - 1) as f64;
                Ok((0..*nlambda)
                    .map(|k| lambda_max * (step * k as f64).exp())
                    .collect())
            }
            LambdaPath::Explicit(values) => {
                if values.is_empty() || values.iter().any(|l| !l.is_finite() || *l <= 0.0) {
                    return Err(PredictError::InvalidInput(
                        "explicit lambda paths must be non-empty and positive".into(),
                    ));
                }
                Ok(values.clone())
            }
        }
    }
}

impl PathSolver for CoordinateDescent {
    fn fit_path(
        &self,
        _scratch: Option<&Path>,
        x: &DenseMatrix,
        y: &Response,
        options: &PathOptions,
    ) -> Result<FitPath> {
        if !(0.0..=1.0).contains(&options.alpha) {
            return Err(PredictError::InvalidInput(format!(
                "alpha must lie in [0, 1], got {}",
                options.alpha
            )));
        }
        if x.nrows() == 0 {
            return Err(PredictError::InvalidInput("cannot fit an empty design".into()));
        }

        let objective = Objective::new(y)?;
        let intercept = objective.has_intercept(options.intercept);
        let design = Design::new(x, options.standardize, intercept);
        let k = objective.n_outputs();

        let mut b0 = objective.initial_intercepts(intercept);
        let mut beta = vec![vec![0.0; design.p()]; k];

        let lambda_max = design.max_score(&objective.null_scores(&b0)) / options.alpha.max(1e-3);
        let lambda_max = if lambda_max.is_finite() && lambda_max > 0.0 {
            lambda_max
        } else {
            f64::EPSILON
        };
        let lambdas = self.lambda_sequence(options, lambda_max, x.nrows(), x.ncols())?;
        let auto = matches!(options.lambda, LambdaPath::Auto { .. });
        let scorer = adapter(y.family());

        let mut path = FitPath {
            lambdas: Vec::with_capacity(lambdas.len()),
            models: Vec::with_capacity(lambdas.len()),
        };
        let mut null_dev = None;

        for &lambda in &lambdas {
            self.solve_lambda(&objective, &design, lambda, options.alpha, intercept, &mut beta, &mut b0);
            let model = design.to_model(&beta, &b0, intercept);

            let n_active = model.active_features().len();
            if let Some(pmax) = options.pmax {
                if n_active > pmax && !path.is_empty() {
                    trace!("Path stopped at lambda={:.4e}: {} active > pmax {}", lambda, n_active, pmax);
                    break;
                }
            }

            let mut saturated = false;
            if auto {
                let dev = scorer.deviance(y, &scorer.predict(&model, x));
                match null_dev {
                    None => null_dev = Some(dev),
                    Some(nd) if nd > ZERO_TOL => saturated = 1.0 - dev / nd > MAX_DEV_RATIO,
                    Some(_) => {}
                }
            }

            path.lambdas.push(lambda);
            path.models.push(model);
            if saturated {
                trace!("Path stopped at lambda={:.4e}: deviance explained above {}", lambda, MAX_DEV_RATIO);
                break;
            }
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn auto(alpha: f64, nlambda: usize) -> PathOptions {
        PathOptions {
            alpha,
            lambda: LambdaPath::Auto { nlambda },
            standardize: true,
            intercept: true,
            pmax: None,
        }
    }

    fn simulated(n: usize, p: usize, seed: u64) -> DenseMatrix {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        DenseMatrix::from_fn(n, p, |_, _| rng.gen::<f64>() * 2.0 - 1.0)
    }

    #[test]
    fn test_gaussian_first_model_is_empty_and_path_decreases() {
        let x = simulated(50, 5, 1);
        let y: Vec<f64> = (0..50).map(|i| 1.0 + 3.0 * x.get(i, 0) - 2.0 * x.get(i, 2)).collect();
        let path = CoordinateDescent::default()
            .fit_path(None, &x, &Response::Continuous(y.clone()), &auto(1.0, 30))
            .unwrap();

        assert!(path.models[0].active_features().is_empty());
        assert!((path.models[0].intercept[0] - mean(&y)).abs() < 1e-8);
        assert!(path.lambdas.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_gaussian_recovers_coefficients_at_small_lambda() {
        let x = simulated(80, 4, 2);
        let y: Vec<f64> = (0..80).map(|i| 0.5 + 2.0 * x.get(i, 1) - 1.0 * x.get(i, 3)).collect();
        let options = PathOptions {
            lambda: LambdaPath::Explicit(vec![1e-1, 1e-3, 1e-6]),
            ..auto(0.5, 0)
        };
        let path = CoordinateDescent::default()
            .fit_path(None, &x, &Response::Continuous(y), &options)
            .unwrap();
        let last = path.models.last().unwrap();
        assert!((last.coefficients.get(1, 0) - 2.0).abs() < 1e-3);
        assert!((last.coefficients.get(3, 0) + 1.0).abs() < 1e-3);
        assert!(last.coefficients.get(0, 0).abs() < 1e-3);
        assert!((last.intercept[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_poisson_path_is_finite_and_learns_signal() {
        let x = simulated(120, 3, 3);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(33);
        let y: Vec<f64> = (0..120)
            .map(|i| {
                let mu = (0.3 + 0.8 * x.get(i, 0)).exp();
                // crude Poisson draw by inversion
                let mut k = 0.0;
                let mut p = (-mu).exp();
                let mut cdf = p;
                let u: f64 = rng.gen();
                while u > cdf && k < 50.0 {
                    k += 1.0;
                    p *= mu / k;
                    cdf += p;
                }
                k
            })
            .collect();
        let path = CoordinateDescent::default()
            .fit_path(None, &x, &Response::Count(y), &auto(1.0, 20))
            .unwrap();
        let last = path.models.last().unwrap();
        assert!(last.coefficients.all_finite());
        assert!(last.coefficients.get(0, 0) > 0.4, "beta0 {}", last.coefficients.get(0, 0));
    }

    #[test]
    fn test_multinomial_separates_classes() {
        let x = simulated(90, 2, 4);
        let labels: Vec<usize> = (0..90)
            .map(|i| {
                let v = x.get(i, 0);
                if v < -0.33 {
                    0
                } else if v < 0.33 {
                    1
                } else {
                    2
                }
            })
            .collect();
        let y = Response::classes(labels, 3).unwrap();
        let path = CoordinateDescent::default()
            .fit_path(None, &x, &y, &auto(1.0, 15))
            .unwrap();
        let last = path.models.last().unwrap();
        assert_eq!(last.n_outputs(), 3);
        // Class 2 rises with x0 faster than class 0
        assert!(last.coefficients.get(0, 2) > last.coefficients.get(0, 0));
    }

    #[test]
    fn test_cox_derivatives_match_brute_force() {
        let time: [f64; 5] = [3.0, 1.0, 2.0, 2.0, 5.0];
        let status = [true, true, false, true, false];
        let eta = [0.1, -0.2, 0.3, 0.0, 0.5];
        let mut order: Vec<usize> = (0..5).collect();
        order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
        let (grad, _) = cox_derivatives(&eta, &time, &status, &order);

        for i in 0..5 {
            let ri = eta[i].exp();
            let mut g = if status[i] { 1.0 } else { 0.0 };
            for k in 0..5 {
                if status[k] && time[k] <= time[i] {
                    let s: f64 = (0..5).filter(|&m| time[m] >= time[k]).map(|m| eta[m].exp()).sum();
                    g -= ri / s;
                }
            }
            assert!((grad[i] - g).abs() < 1e-12, "grad[{}] {} vs {}", i, grad[i], g);
        }
    }

    #[test]
    fn test_cox_path_has_no_intercept() {
        let x = simulated(60, 3, 5);
        let time: Vec<f64> = (0..60).map(|i| (1.0 - 0.9 * x.get(i, 0)).max(0.05) + i as f64 * 1e-3).collect();
        let status: Vec<bool> = (0..60).map(|i| i % 4 != 0).collect();
        let y = Response::survival(time, status).unwrap();
        let path = CoordinateDescent::default()
            .fit_path(None, &x, &y, &auto(0.5, 10))
            .unwrap();
        let last = path.models.last().unwrap();
        assert_eq!(last.intercept, vec![0.0]);
        // Larger x0 means earlier failure, so higher risk
        assert!(last.coefficients.get(0, 0) > 0.0);
    }

    #[test]
    fn test_pmax_truncates_path() {
        let x = simulated(40, 10, 6);
        let y: Vec<f64> = (0..40).map(|i| (0..10).map(|j| x.get(i, j)).sum()).collect();
        let options = PathOptions {
            pmax: Some(3),
            ..auto(1.0, 50)
        };
        let path = CoordinateDescent::default()
            .fit_path(None, &x, &Response::Continuous(y), &options)
            .unwrap();
        assert!(path.models.iter().all(|m| m.active_features().len() <= 3));
        assert!(path.len() < 50);
    }

    #[test]
    fn test_rejects_bad_alpha() {
        let x = simulated(5, 2, 7);
        let y = Response::Continuous(vec![0.0; 5]);
        let err = CoordinateDescent::default().fit_path(None, &x, &y, &auto(1.5, 5));
        assert!(matches!(err, Err(PredictError::InvalidInput(_))));
    }
}
