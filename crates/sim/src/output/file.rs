use super::writer::{AlignmentFormat, AlignmentWriter, LeafSink};
use crate::base::{Sequence, SequenceType};
use phylosim_codec::{CodecStrategy, EncodedWriter};
use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

type FileStream = EncodedWriter<BufWriter<NamedTempFile>>;

/// An alignment file that only appears at its destination once complete.
///
/// Leaves are streamed into a temporary file next to the destination,
/// through the selected codec. [`AlignmentFile::commit`] moves it into place;
/// dropping the value without committing removes the partial file.
pub struct AlignmentFile {
    path: PathBuf,
    writer: AlignmentWriter<FileStream>,
}

impl AlignmentFile {
    pub fn create(
        path: impl Into<PathBuf>,
        format: AlignmentFormat,
        seq_type: SequenceType,
        codec: CodecStrategy,
    ) -> io::Result<Self> {
        let path = path.into();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let temp = NamedTempFile::new_in(&dir)?;
        let stream = EncodedWriter::new(codec, BufWriter::new(temp))?;
        Ok(Self {
            path,
            writer: AlignmentWriter::new(stream, format, seq_type),
        })
    }

    /// Destination path for dataset `index` of a run: `{prefix}_{index}.{ext}`
    /// plus the codec suffix, or `{prefix}.{ext}` when `index` is `None`.
    pub fn output_path(
        prefix: &Path,
        index: Option<usize>,
        format: AlignmentFormat,
        codec: CodecStrategy,
    ) -> PathBuf {
        let mut name = prefix.as_os_str().to_os_string();
        if let Some(i) = index {
            name.push(format!("_{i}"));
        }
        name.push(".");
        name.push(format.extension());
        name.push(codec.extension());
        PathBuf::from(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finish the stream and move the file to its destination.
    pub fn commit(self) -> io::Result<PathBuf> {
        let buffered = self.writer.into_inner().finish()?;
        let temp = buffered.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        tracing::info!(path = %self.path.display(), "alignment written");
        Ok(self.path)
    }
}

impl LeafSink for AlignmentFile {
    fn begin(&mut self, names: &[&str], length: usize) -> io::Result<()> {
        self.writer.begin(names, length)
    }

    fn write_leaf(&mut self, name: &str, sequence: &Sequence) -> io::Result<()> {
        self.writer.write_leaf(name, sequence)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.finish()
    }
}
