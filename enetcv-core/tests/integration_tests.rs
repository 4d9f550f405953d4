//! End-to-end prediction runs on simulated data.
//!
//! Data come from seeded ChaCha streams so every run is reproducible.
//! Fold counts, alpha grids and path lengths are kept small to bound
//! test time in debug builds.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use enetcv_core::config::PredictConfig;
use enetcv_core::cv::permutation::DependencyStructure;
use enetcv_core::{run_prediction, PredictionInputs, Response};
use enetcv_linalg::DenseMatrix;

fn features(n: usize, p: usize, rng: &mut ChaCha8Rng) -> DenseMatrix {
    DenseMatrix::from_fn(n, p, |_, _| rng.gen::<f64>() * 2.0 - 1.0)
}

fn small_config() -> PredictConfig {
    PredictConfig {
        alpha_grid: vec![0.5, 1.0],
        cv_scheme: [5, 5],
        nlambda: 30,
        ..Default::default()
    }
}

fn inputs(x: DenseMatrix, y: Response) -> PredictionInputs {
    PredictionInputs {
        x,
        y,
        confounds: None,
        structure: None,
        permutations: None,
    }
}

mod continuous {
    use super::*;

    #[test]
    fn test_sparse_signal_single_pass() {
        let mut rng = ChaCha8Rng::seed_from_u64(100);
        let (n, p) = (100, 50);
        let x = features(n, p, &mut rng);
        let y: Vec<f64> = (0..n)
            .map(|i| (0..10).map(|j| x.get(i, j)).sum::<f64>() + 0.5 * (rng.gen::<f64>() - 0.5))
            .collect();

        let outcome = run_prediction(&inputs(x, Response::Continuous(y)), &small_config()).unwrap();
        let s = &outcome.stats;

        assert!(s.dev.is_finite() && s.nulldev.is_finite());
        assert!(s.cod > 0.0 && s.cod <= 1.0, "cod = {}", s.cod);
        assert!((0.0..=1.0).contains(&s.pval));
        assert_eq!(s.n_perm, 1);
        assert_eq!(outcome.predictions.nrows(), n);
        assert_eq!(outcome.folds.len(), 5);
        assert!(s.accuracy.is_none());
        assert!(s.dev_deconf.is_none());
    }

    #[test]
    fn test_permutation_pvalue_minimal_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(200);
        let (n, p) = (30, 5);
        let x = features(n, p, &mut rng);
        let y: Vec<f64> = (0..n)
            .map(|i| 5.0 * x.get(i, 0) + 0.1 * (rng.gen::<f64>() - 0.5))
            .collect();
        let config = PredictConfig {
            alpha_grid: vec![1.0],
            cv_scheme: [3, 3],
            nlambda: 10,
            n_perm: 200,
            seed: 7,
            ..Default::default()
        };

        let outcome = run_prediction(&inputs(x, Response::Continuous(y)), &config).unwrap();
        let s = &outcome.stats;

        assert_eq!(s.perm_stats.len(), 200);
        let reference = s.perm_stats[0];
        let at_or_below = s.perm_stats.iter().filter(|&&d| d <= reference).count();
        assert_eq!(s.pval, at_or_below as f64 / 200.0);
        assert_eq!(s.pval, 1.0 / 200.0);
        assert!(s.pval_parametric < 1e-6);
    }

    #[test]
    fn test_confounds_report_deconfounded_stats() {
        let mut rng = ChaCha8Rng::seed_from_u64(300);
        let n = 60;
        let c = DenseMatrix::from_fn(n, 2, |_, _| rng.gen::<f64>());
        let x = DenseMatrix::from_fn(n, 8, |i, j| rng.gen::<f64>() + c.get(i, j % 2));
        let y: Vec<f64> = (0..n)
            .map(|i| 3.0 * x.get(i, 1) + 4.0 * c.get(i, 0) + 0.2 * rng.gen::<f64>())
            .collect();

        let mut run = inputs(x, Response::Continuous(y));
        run.confounds = Some(c);
        let outcome = run_prediction(&run, &small_config()).unwrap();
        let s = &outcome.stats;

        assert!(outcome.predictions_deconf.is_some());
        let dev = s.dev_deconf.unwrap();
        let nulldev = s.nulldev_deconf.unwrap();
        assert!(dev.is_finite() && nulldev > 0.0);
        assert!((s.cod_deconf.unwrap() - (1.0 - dev / nulldev)).abs() < 1e-12);
        assert!(s.pval_deconf.is_some());
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut rng = ChaCha8Rng::seed_from_u64(400);
        let x = features(40, 6, &mut rng);
        let y: Vec<f64> = (0..40).map(|i| x.get(i, 3) + 0.3 * rng.gen::<f64>()).collect();
        let config = PredictConfig {
            n_perm: 3,
            ..small_config()
        };
        let run = inputs(x, Response::Continuous(y));
        let a = run_prediction(&run, &config).unwrap();
        let b = run_prediction(&run, &config).unwrap();
        assert_eq!(a.stats.perm_stats, b.stats.perm_stats);
        assert!(a.predictions.max_abs_diff(&b.predictions) == 0.0);
    }
}

mod count {
    use super::*;

    #[test]
    fn test_poisson_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(500);
        let n = 80;
        let x = features(n, 6, &mut rng);
        let y: Vec<f64> = (0..n)
            .map(|i| (1.0 + 0.8 * x.get(i, 0)).exp().round())
            .collect();

        let outcome = run_prediction(&inputs(x, Response::Count(y)), &small_config()).unwrap();
        let s = &outcome.stats;
        assert!(outcome.predictions.col(0).iter().all(|&mu| mu > 0.0));
        assert!(s.dev >= 0.0 && s.nulldev > s.dev);
        assert!((0.0..=1.0).contains(&s.pval));
    }
}

mod multiclass {
    use super::*;

    #[test]
    fn test_three_classes() {
        let mut rng = ChaCha8Rng::seed_from_u64(600);
        let n = 90;
        let x = features(n, 10, &mut rng);
        let labels: Vec<usize> = (0..n)
            .map(|i| {
                let v = x.get(i, 0) + 0.3 * (rng.gen::<f64>() - 0.5);
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
        let config = PredictConfig {
            alpha_grid: vec![1.0],
            cv_scheme: [3, 3],
            nlambda: 20,
            ..Default::default()
        };

        let outcome = run_prediction(&inputs(x, y), &config).unwrap();
        let s = &outcome.stats;
        let accuracy = s.accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
        assert!(accuracy > 0.5);
        assert!(s.dev >= 0.0 && s.nulldev >= 0.0);
        assert!((s.cod - (1.0 - s.dev / s.nulldev)).abs() < 1e-12);
        assert_eq!(outcome.predictions.ncols(), 3);
        assert_eq!(outcome.predicted_labels.unwrap().len(), n);
    }
}

mod survival {
    use super::*;

    #[test]
    fn test_cox_predictions_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(700);
        let n = 60;
        let x = features(n, 5, &mut rng);
        let time: Vec<f64> = (0..n)
            .map(|i| {
                let u: f64 = rng.gen::<f64>().max(1e-6);
                -u.ln() / (1.2 * x.get(i, 0)).exp()
            })
            .collect();
        let status: Vec<bool> = (0..n).map(|_| rng.gen::<f64>() < 0.8).collect();
        let y = Response::survival(time, status).unwrap();

        let outcome = run_prediction(&inputs(x, y), &small_config()).unwrap();
        assert!(outcome.predictions.col(0).iter().all(|&r| r > 0.0));
        assert!(outcome.stats.dev.is_finite());
        assert!(outcome.stats.nulldev.is_finite());
    }
}

mod structure {
    use super::*;
    use enetcv_core::cv::permutation::{is_bijection, PermutationEngine};

    fn sibling_pairs(n: usize) -> DependencyStructure {
        let entries: Vec<(usize, usize, u8)> = (0..n / 2).map(|q| (2 * q, 2 * q + 1, 1)).collect();
        DependencyStructure::from_pairs(n, &entries).unwrap()
    }

    #[test]
    fn test_permutations_keep_pairs_in_pool() {
        let n = 40;
        let engine = PermutationEngine::new(n, 50, Some(sibling_pairs(n)), None).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(800);
        for k in 1..50 {
            let perm = engine.permutation(k, &mut rng).unwrap();
            assert!(is_bijection(&perm, n));
            for q in 0..n / 2 {
                // The two members draw from the two members of one pair
                let (a, b) = (perm[2 * q], perm[2 * q + 1]);
                assert_eq!(a / 2, b / 2, "pair {} split across sources {} {}", q, a, b);
            }
        }
    }

    #[test]
    fn test_run_with_structure() {
        let mut rng = ChaCha8Rng::seed_from_u64(900);
        let n = 40;
        let x = features(n, 6, &mut rng);
        let y: Vec<f64> = (0..n).map(|i| 2.0 * x.get(i, 2) + 0.2 * rng.gen::<f64>()).collect();
        let mut run = inputs(x, Response::Continuous(y));
        run.structure = Some(sibling_pairs(n));
        let config = PredictConfig {
            n_perm: 4,
            ..small_config()
        };

        let outcome = run_prediction(&run, &config).unwrap();
        assert_eq!(outcome.stats.perm_stats.len(), 4);
        // Folds hold whole pairs, so test sizes are even
        assert!(outcome.folds.iter().all(|f| f.n_test % 2 == 0));
    }

    #[test]
    fn test_supplied_permutations_set_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(1000);
        let n = 30;
        let x = features(n, 4, &mut rng);
        let y: Vec<f64> = (0..n).map(|i| x.get(i, 0) + 0.1 * rng.gen::<f64>()).collect();
        let identity: Vec<usize> = (0..n).collect();
        let reversed: Vec<usize> = (0..n).rev().collect();
        let mut run = inputs(x, Response::Continuous(y));
        run.permutations = Some(vec![identity, reversed]);
        let config = PredictConfig {
            n_perm: 99,
            cv_scheme: [3, 3],
            ..small_config()
        };

        let outcome = run_prediction(&run, &config).unwrap();
        assert_eq!(outcome.stats.n_perm, 2);
    }
}

mod errors {
    use super::*;
    use enetcv_core::PredictError;

    #[test]
    fn test_too_many_outer_folds() {
        let mut rng = ChaCha8Rng::seed_from_u64(1100);
        let x = features(6, 3, &mut rng);
        let y = Response::Continuous(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let config = PredictConfig {
            cv_scheme: [10, 3],
            ..small_config()
        };
        assert!(matches!(
            run_prediction(&inputs(x, y), &config),
            Err(PredictError::Configuration(_))
        ));
    }
}
