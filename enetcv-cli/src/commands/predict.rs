//! Nested cross-validated prediction.
//!
//! enetcv predict --features X.tsv --response y.tsv --family gaussian --output-prefix out

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use enetcv_core::config::PredictConfig;
use enetcv_core::{run_prediction, Family, PredictionInputs};
use enetcv_io::output::{write_predictions, write_stats_json};
use enetcv_io::{read_matrix, read_permutations, read_response, read_structure};

use super::parse_list;

#[derive(Args)]
pub struct PredictArgs {
    /// Feature matrix (samples x features)
    #[arg(long)]
    features: PathBuf,

    /// Response file
    #[arg(long)]
    response: PathBuf,

    /// Response family: gaussian, poisson, multinomial or cox
    #[arg(long)]
    family: String,

    /// Confound matrix (samples x confounds)
    #[arg(long)]
    confounds: Option<PathBuf>,

    /// Dependency structure (dense matrix or coordinate list)
    #[arg(long)]
    structure: Option<PathBuf>,

    /// Pre-supplied permutations (samples x permutations, 1-based)
    #[arg(long)]
    permutations: Option<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Features kept by the pre-filter
    #[arg(long)]
    nfeatures: Option<usize>,

    /// Maximum nonzero features per fitted model
    #[arg(long)]
    max_active: Option<usize>,

    /// Elastic-net mixing weights (comma-separated)
    #[arg(long)]
    alpha: Option<String>,

    /// Outer and inner fold counts, 0 for leave-one-out (e.g. 10,10)
    #[arg(long)]
    cv_scheme: Option<String>,

    /// Number of permutations, including the unpermuted run
    #[arg(long)]
    nperm: Option<usize>,

    /// Penalty path length
    #[arg(long)]
    nlambda: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log every fold's selection at info level
    #[arg(long, default_value = "false")]
    fold_details: bool,

    /// Output file prefix
    #[arg(long)]
    output_prefix: String,
}

fn load_config(args: &PredictArgs) -> Result<PredictConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => PredictConfig::default(),
    };

    if args.nfeatures.is_some() {
        config.prefilter_features = args.nfeatures;
    }
    if args.max_active.is_some() {
        config.max_active_features = args.max_active;
    }
    if let Some(alpha) = &args.alpha {
        config.alpha_grid = parse_list(alpha, "alpha")?;
    }
    if let Some(scheme) = &args.cv_scheme {
        let folds: Vec<usize> = parse_list(scheme, "cv-scheme")?;
        if folds.len() != 2 {
            bail!("--cv-scheme takes two fold counts, got {}", folds.len());
        }
        config.cv_scheme = [folds[0], folds[1]];
    }
    if let Some(nperm) = args.nperm {
        config.n_perm = nperm;
    }
    if let Some(nlambda) = args.nlambda {
        config.nlambda = nlambda;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.verbose |= args.fold_details;
    Ok(config)
}

pub fn run(args: PredictArgs) -> Result<()> {
    let family: Family = args.family.parse()?;
    let config = load_config(&args)?;

    info!("=== enetcv predict ===");
    info!("Family: {}", family);
    info!("Features: {}", args.features.display());
    info!("Response: {}", args.response.display());

    let x = read_matrix(&args.features)?;
    let response = read_response(&args.response, family)?;
    let n = response.response.len();
    if x.nrows() != n {
        bail!("{} feature rows but {} responses", x.nrows(), n);
    }
    info!("Loaded {} samples x {} features", n, x.ncols());

    let confounds = args.confounds.as_deref().map(read_matrix).transpose()?;
    let structure = args
        .structure
        .as_deref()
        .map(|p| read_structure(p, n))
        .transpose()?;
    let permutations = args
        .permutations
        .as_deref()
        .map(|p| read_permutations(p, n))
        .transpose()?;

    let inputs = PredictionInputs {
        x,
        y: response.response,
        confounds,
        structure,
        permutations,
    };
    let outcome = run_prediction(&inputs, &config)?;

    let predictions_path = format!("{}.predictions.tsv", args.output_prefix);
    let stats_path = format!("{}.stats.json", args.output_prefix);
    write_predictions(
        Path::new(&predictions_path),
        &outcome,
        response.class_values.as_deref(),
    )?;
    write_stats_json(Path::new(&stats_path), &outcome)?;
    info!("Wrote {} and {}", predictions_path, stats_path);

    let s = &outcome.stats;
    println!("family\t{}", s.family);
    println!("dev\t{:.6}", s.dev);
    println!("nulldev\t{:.6}", s.nulldev);
    println!("cod\t{:.6}", s.cod);
    println!("pval\t{:.6e}", s.pval);
    if let Some(acc) = s.accuracy {
        println!("accuracy\t{:.6}", acc);
    }
    if let Some(cod) = s.cod_deconf {
        println!("cod_deconf\t{:.6}", cod);
    }
    Ok(())
}
