//! Print a permutation table.
//!
//! Column k holds permutation k as drawn by `predict` with the same seed:
//! one ChaCha stream per permutation, the first column the identity.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use enetcv_core::cv::permutation::PermutationEngine;
use enetcv_io::read_structure;

#[derive(Args)]
pub struct PermuteArgs {
    /// Number of samples
    #[arg(long)]
    n: usize,

    /// Dependency structure for structure-preserving permutations
    #[arg(long)]
    structure: Option<PathBuf>,

    /// Number of permutations, including the identity
    #[arg(long)]
    nperm: usize,

    /// Random seed
    #[arg(long, default_value = "0")]
    seed: u64,
}

pub fn run(args: PermuteArgs) -> Result<()> {
    let structure = args
        .structure
        .as_deref()
        .map(|p| read_structure(p, args.n))
        .transpose()?;
    let engine = PermutationEngine::new(args.n, args.nperm, structure, None)?;
    info!("Generating {} permutations ({:?})", engine.n_perm(), engine.mode());

    let mut columns = Vec::with_capacity(engine.n_perm());
    for index in 0..engine.n_perm() {
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
        rng.set_stream(index as u64);
        columns.push(engine.permutation(index, &mut rng)?);
    }

    for i in 0..args.n {
        let row: Vec<String> = columns.iter().map(|c| (c[i] + 1).to_string()).collect();
        println!("{}", row.join("\t"));
    }
    Ok(())
}
