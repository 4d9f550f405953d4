//! Print an outer fold assignment.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use enetcv_core::cv::folds::make_folds;
use enetcv_core::Family;
use enetcv_io::{read_response, read_structure};

#[derive(Args)]
pub struct FoldsArgs {
    /// Response file, used for class stratification
    #[arg(long)]
    response: PathBuf,

    /// Response family: gaussian, poisson, multinomial or cox
    #[arg(long)]
    family: String,

    /// Number of folds, 0 for leave-one-out
    #[arg(long)]
    k: usize,

    /// Dependency structure; paired samples share a fold
    #[arg(long)]
    structure: Option<PathBuf>,

    /// Random seed
    #[arg(long, default_value = "0")]
    seed: u64,
}

pub fn run(args: FoldsArgs) -> Result<()> {
    let family: Family = args.family.parse()?;
    let y = read_response(&args.response, family)?.response;
    let pairs = match &args.structure {
        Some(path) => read_structure(path, y.len())?.all_pairs(),
        None => Vec::new(),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let folds = make_folds(&y, args.k, &pairs, &mut rng)?;

    println!("sample\tfold");
    for (i, fold) in folds.fold_of().iter().enumerate() {
        println!("{}\t{}", i + 1, fold + 1);
    }
    Ok(())
}
