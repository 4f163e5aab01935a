//! Shared default values for simulation configuration.
//! These values are used by the `init` command and as `simulate` fallbacks.

pub const CONFIG_FILE: &str = "phylosim.json";
pub const OUTPUT_PREFIX: &str = "alignment";

pub const SEQUENCE_LENGTH: usize = 1000;
pub const NUM_DATASETS: usize = 1;
pub const MODEL: &str = "JC";
pub const SEQUENCE_TYPE: &str = "dna";
pub const BRANCH_SCALE: f64 = 1.0;

pub const FORMAT: &str = "phylip";
pub const COMPRESSION: &str = "plain";
