//! Output encodings for simulated alignments.
//!
//! Provides strategies for writing alignment text either verbatim or as a
//! compressed stream, both as whole-buffer codecs and as streaming writers.

mod error;
mod strategies;
pub mod stream;
mod traits;

pub use error::CodecError as Error;
pub use error::CodecError;
pub use strategies::{Plain, Zstd};
pub use stream::EncodedWriter;
pub use traits::Codec;

use serde::{Deserialize, Serialize};

/// Strategies for encoding alignment output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecStrategy {
    /// Plain text.
    #[default]
    Plain,
    /// A single zstd frame.
    Zstd,
}

impl CodecStrategy {
    /// Encode using the selected strategy.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            CodecStrategy::Plain => Plain.encode(data),
            CodecStrategy::Zstd => Zstd.encode(data),
        }
    }

    /// Decode using the selected strategy.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            CodecStrategy::Plain => Plain.decode(data),
            CodecStrategy::Zstd => Zstd.decode(data),
        }
    }

    /// Suffix appended to output file names written with this strategy.
    pub fn extension(&self) -> &'static str {
        match self {
            CodecStrategy::Plain => Plain.extension(),
            CodecStrategy::Zstd => Zstd.extension(),
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, CodecStrategy::Plain)
    }
}

impl std::fmt::Display for CodecStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Zstd => write!(f, "zstd"),
        }
    }
}

impl std::str::FromStr for CodecStrategy {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "none" | "text" => Ok(Self::Plain),
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(CodecError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Enum dispatch is preferred, the trait impl lets a strategy be passed where
/// a `dyn Codec` is expected.
impl Codec for CodecStrategy {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        CodecStrategy::encode(self, data)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        CodecStrategy::decode(self, data)
    }

    fn extension(&self) -> &'static str {
        CodecStrategy::extension(self)
    }
}
