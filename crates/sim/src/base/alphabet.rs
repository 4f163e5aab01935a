use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ConfigError, InvalidSymbol};

const BINARY_SYMBOLS: &[u8] = b"01";
const DNA_SYMBOLS: &[u8] = b"ACGT";
/// Standard phylogenetics ordering (A R N D C Q E G H I L K M F P S T W Y V).
const PROTEIN_SYMBOLS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";

/// The kind of characters being simulated.
///
/// The state index of a symbol is its position in [`SequenceType::symbols`]
/// and is stable across the crate (for DNA: A=0, C=1, G=2, T=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    Binary,
    #[default]
    Dna,
    Protein,
}

impl SequenceType {
    /// Number of states `S` of the alphabet.
    #[inline(always)]
    pub const fn num_states(self) -> usize {
        self.symbols().len()
    }

    /// Symbols in state order.
    #[inline(always)]
    pub const fn symbols(self) -> &'static [u8] {
        match self {
            Self::Binary => BINARY_SYMBOLS,
            Self::Dna => DNA_SYMBOLS,
            Self::Protein => PROTEIN_SYMBOLS,
        }
    }

    /// Map an ASCII symbol to its state. Lowercase is accepted, and `U` is
    /// read as `T` for nucleotides.
    #[inline]
    pub fn state_of(self, symbol: u8) -> Result<u8, InvalidSymbol> {
        let upper = symbol.to_ascii_uppercase();
        let upper = match (self, upper) {
            (Self::Dna, b'U') => b'T',
            (_, c) => c,
        };
        self.symbols()
            .iter()
            .position(|&s| s == upper)
            .map(|i| i as u8)
            .ok_or(InvalidSymbol(symbol))
    }

    /// Map a state back to its uppercase ASCII symbol.
    ///
    /// # Panics
    /// Panics if `state` is not below [`SequenceType::num_states`].
    #[inline(always)]
    pub fn symbol_of(self, state: u8) -> u8 {
        self.symbols()[state as usize]
    }

    /// Short name as used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "BIN",
            Self::Dna => "DNA",
            Self::Protein => "AA",
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SequenceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BIN" | "BINARY" => Ok(Self::Binary),
            "DNA" | "NT" | "NUCLEOTIDE" => Ok(Self::Dna),
            "AA" | "PROTEIN" => Ok(Self::Protein),
            _ => Err(ConfigError::UnsupportedSequenceType(s.to_string())),
        }
    }
}
