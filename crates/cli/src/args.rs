use clap::Args;
use phylosim_codec::CodecStrategy;
use phylosim_sim::base::SequenceType;
use phylosim_sim::output::AlignmentFormat;
use std::path::PathBuf;

use crate::defaults;

/// Settings shared by every command. Each one given on the command line
/// replaces the value from the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Number of sites per sequence
    #[arg(short = 'L', long)]
    pub length: Option<usize>,

    /// Substitution model, e.g. "HKY{2}+F{0.3,0.2,0.2,0.3}+G4{0.5}"
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sequence type (binary, dna, protein)
    #[arg(long = "seqtype")]
    pub sequence_type: Option<SequenceType>,

    /// Number of alignments to generate
    #[arg(short = 'n', long)]
    pub datasets: Option<usize>,

    /// Random seed; dataset i uses seed + i
    #[arg(long)]
    pub seed: Option<u64>,

    /// Factor applied to every branch length
    #[arg(long)]
    pub branch_scale: Option<f64>,

    /// Model for branches annotated with [&model=NAME], as NAME=MODEL
    #[arg(long = "branch-model", value_name = "NAME=MODEL")]
    pub branch_models: Vec<String>,

    /// Taxa whose sites are swapped pairwise (FunDi), comma separated
    #[arg(long, value_delimiter = ',', requires = "fundi_proportion")]
    pub fundi_taxa: Vec<String>,

    /// Proportion of sites swapped within each FunDi pair
    #[arg(long, requires = "fundi_taxa")]
    pub fundi_proportion: Option<f64>,

    /// Fixed root sequence instead of a random one
    #[arg(long)]
    pub ancestral: Option<String>,

    /// Output format (phylip, fasta)
    #[arg(short = 'f', long)]
    pub format: Option<AlignmentFormat>,

    /// Output compression (plain, zstd)
    #[arg(long)]
    pub compression: Option<CodecStrategy>,

    /// Hold all leaves until the walk is complete instead of streaming them
    #[arg(long)]
    pub no_streaming: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Configuration file to write
    #[arg(short, long, default_value = defaults::CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub settings: ConfigOverrides,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Newick tree file
    #[arg(long)]
    pub tree: PathBuf,

    /// Configuration file (defaults are used without one)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub settings: ConfigOverrides,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Newick tree file
    #[arg(long)]
    pub tree: PathBuf,

    /// Configuration file (defaults are used without one)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output prefix: PREFIX.phy, or PREFIX_i.phy for several datasets (.fa for
    /// FASTA, plus .zst when compressed)
    #[arg(short, long, default_value = defaults::OUTPUT_PREFIX)]
    pub output: PathBuf,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub settings: ConfigOverrides,
}
