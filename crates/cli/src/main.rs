mod args;
mod commands;
pub mod defaults;
mod printing;
mod utils;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use args::{InitArgs, SimulateArgs, ValidateArgs};
use commands::{init, simulate, validate};

/// PhyloSim: sequence evolution along phylogenetic trees
///
/// Simulates alignments by evolving a root sequence down every branch of a
/// tree under a Markov substitution model.
#[derive(Parser, Debug)]
#[command(name = "phylosim")]
#[command(
    author,
    version,
    about = "Simulates sequence alignments along phylogenetic trees",
    long_about = None
)]
struct Cli {
    /// Number of threads to use for parallel datasets
    ///
    /// If not specified, defaults to the number of logical CPUs.
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file with default settings.
    ///
    /// Edit it, then pass it to `simulate --config`.
    Init(InitArgs),

    /// Check a tree against a configuration without simulating.
    Validate(ValidateArgs),

    /// Simulate one or more alignments along a tree.
    Simulate(Box<SimulateArgs>),
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match cli.command {
        Commands::Init(args) => init::init_configuration(&args)?,
        Commands::Validate(args) => validate::validate_setup(&args)?,
        Commands::Simulate(args) => simulate::run_simulation(&args)?,
    }

    Ok(())
}
