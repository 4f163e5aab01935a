use crate::base::{Sequence, SequenceType};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Text layout of a written alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentFormat {
    /// Sequential PHYLIP: `<taxa> <sites>` header, one padded row per taxon.
    /// Whitespace inside taxon names is written as `_`.
    #[default]
    Phylip,
    /// FASTA with each sequence on a single line.
    Fasta,
}

impl AlignmentFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Phylip => "phy",
            Self::Fasta => "fa",
        }
    }
}

impl fmt::Display for AlignmentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phylip => write!(f, "phylip"),
            Self::Fasta => write!(f, "fasta"),
        }
    }
}

impl FromStr for AlignmentFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "phylip" | "phy" => Ok(Self::Phylip),
            "fasta" | "fa" | "fas" => Ok(Self::Fasta),
            _ => Err(ConfigError::InvalidParameter(format!(
                "unknown alignment format '{s}'"
            ))),
        }
    }
}

/// Destination for simulated leaf sequences.
///
/// `begin` is called once before any leaf, with every taxon name in output
/// order; `write_leaf` once per leaf; `finish` after the last leaf.
pub trait LeafSink {
    fn begin(&mut self, names: &[&str], length: usize) -> io::Result<()>;

    fn write_leaf(&mut self, name: &str, sequence: &Sequence) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes leaves as PHYLIP or FASTA text to any [`Write`].
#[derive(Debug)]
pub struct AlignmentWriter<W: Write> {
    inner: W,
    format: AlignmentFormat,
    seq_type: SequenceType,
    name_width: usize,
    line: Vec<u8>,
}

impl<W: Write> AlignmentWriter<W> {
    pub fn new(inner: W, format: AlignmentFormat, seq_type: SequenceType) -> Self {
        Self {
            inner,
            format,
            seq_type,
            name_width: 0,
            line: Vec::new(),
        }
    }

    pub fn format(&self) -> AlignmentFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> LeafSink for AlignmentWriter<W> {
    fn begin(&mut self, names: &[&str], length: usize) -> io::Result<()> {
        self.name_width = names.iter().map(|n| n.len()).max().unwrap_or(0);
        self.line.reserve(self.name_width + length + 2);
        if self.format == AlignmentFormat::Phylip {
            writeln!(self.inner, "{} {}", names.len(), length)?;
        }
        Ok(())
    }

    fn write_leaf(&mut self, name: &str, sequence: &Sequence) -> io::Result<()> {
        self.line.clear();
        match self.format {
            AlignmentFormat::Phylip => {
                // PHYLIP readers split the name from the sites at whitespace.
                let bytes = name.bytes();
                self.line
                    .extend(bytes.map(|b| if b.is_ascii_whitespace() { b'_' } else { b }));
                let pad = self.name_width.saturating_sub(name.len()) + 1;
                self.line.resize(self.line.len() + pad, b' ');
            }
            AlignmentFormat::Fasta => {
                self.line.push(b'>');
                self.line.extend_from_slice(name.as_bytes());
                self.line.push(b'\n');
            }
        }
        let seq_type = self.seq_type;
        self.line
            .extend(sequence.as_slice().iter().map(|&s| seq_type.symbol_of(s)));
        self.line.push(b'\n');
        self.inner.write_all(&self.line)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Keeps leaves in memory, in the order they were written.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    taxa: Vec<String>,
    length: usize,
    leaves: Vec<(String, Sequence)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Taxon names announced by `begin`.
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn leaves(&self) -> &[(String, Sequence)] {
        &self.leaves
    }

    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.leaves.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn into_leaves(self) -> Vec<(String, Sequence)> {
        self.leaves
    }
}

impl LeafSink for MemorySink {
    fn begin(&mut self, names: &[&str], length: usize) -> io::Result<()> {
        self.taxa = names.iter().map(|n| n.to_string()).collect();
        self.length = length;
        self.leaves.clear();
        Ok(())
    }

    fn write_leaf(&mut self, name: &str, sequence: &Sequence) -> io::Result<()> {
        self.leaves.push((name.to_string(), sequence.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(format: AlignmentFormat) -> String {
        let mut writer = AlignmentWriter::new(Vec::new(), format, SequenceType::Dna);
        writer.begin(&["A", "Long", "C"], 4).unwrap();
        for (name, seq) in [("A", "ACGT"), ("Long", "AAAA"), ("C", "TTGA")] {
            let seq = Sequence::from_symbols(seq, SequenceType::Dna).unwrap();
            writer.write_leaf(name, &seq).unwrap();
        }
        writer.finish().unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_phylip_layout() {
        assert_eq!(
            write(AlignmentFormat::Phylip),
            "3 4\nA    ACGT\nLong AAAA\nC    TTGA\n"
        );
    }

    #[test]
    fn test_phylip_names_with_spaces() {
        let mut writer =
            AlignmentWriter::new(Vec::new(), AlignmentFormat::Phylip, SequenceType::Dna);
        writer.begin(&["Homo sapiens", "B"], 2).unwrap();
        let seq = Sequence::from_symbols("AC", SequenceType::Dna).unwrap();
        writer.write_leaf("Homo sapiens", &seq).unwrap();
        writer.write_leaf("B", &seq).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "2 2\nHomo_sapiens AC\nB            AC\n");

        let mut writer =
            AlignmentWriter::new(Vec::new(), AlignmentFormat::Fasta, SequenceType::Dna);
        writer.begin(&["Homo sapiens"], 2).unwrap();
        writer.write_leaf("Homo sapiens", &seq).unwrap();
        assert_eq!(writer.into_inner(), b">Homo sapiens\nAC\n");
    }

    #[test]
    fn test_fasta_layout() {
        assert_eq!(
            write(AlignmentFormat::Fasta),
            ">A\nACGT\n>Long\nAAAA\n>C\nTTGA\n"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PHY".parse::<AlignmentFormat>().unwrap(), AlignmentFormat::Phylip);
        assert_eq!("fasta".parse::<AlignmentFormat>().unwrap(), AlignmentFormat::Fasta);
        assert!("nexus".parse::<AlignmentFormat>().is_err());
        assert_eq!(AlignmentFormat::Fasta.extension(), "fa");
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.begin(&["X", "Y"], 2).unwrap();
        sink.write_leaf("Y", &Sequence::from_states(vec![1, 0])).unwrap();
        assert_eq!(sink.taxa(), ["X", "Y"]);
        assert_eq!(sink.get("Y").unwrap().as_slice(), &[1, 0]);
        assert!(sink.get("X").is_none());
    }
}
