//! enetcv: nested cross-validated elastic-net prediction.
//!
//! CLI entry point using clap for argument parsing.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "enetcv",
    version,
    about = "Nested cross-validated elastic-net prediction with permutation testing",
    long_about = "Predicts continuous, count, multi-class or survival responses from\n\
                   high-dimensional features with elastic-net GLMs, nested cross-validation,\n\
                   optional confound removal and structure-aware permutation testing."
)]
struct Cli {
    /// Number of threads to use
    #[arg(long, default_value = "1", global = true)]
    threads: usize,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run nested cross-validated prediction and permutation testing
    Predict(commands::predict::PredictArgs),

    /// Print the outer fold assignment of every sample
    Folds(commands::folds::FoldsArgs),

    /// Print a permutation table (1-based source indices)
    Permute(commands::permute::PermuteArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Set up thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .ok();

    tracing::info!("enetcv v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using {} threads", cli.threads);

    match cli.command {
        Commands::Predict(args) => commands::predict::run(args),
        Commands::Folds(args) => commands::folds::run(args),
        Commands::Permute(args) => commands::permute::run(args),
    }
}
