//! Streaming encoders, so alignments can be written leaf by leaf.

use crate::strategies::ZSTD_LEVEL;
use crate::CodecStrategy;
use std::io::{self, Read, Write};

/// A writer that encodes everything written to it with a [`CodecStrategy`].
///
/// Call [`EncodedWriter::finish`] once done: for compressed strategies this
/// writes the end of the frame, and dropping the writer without finishing
/// leaves a truncated stream behind.
pub enum EncodedWriter<W: Write> {
    Plain(W),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> EncodedWriter<W> {
    pub fn new(strategy: CodecStrategy, inner: W) -> io::Result<Self> {
        match strategy {
            CodecStrategy::Plain => Ok(Self::Plain(inner)),
            CodecStrategy::Zstd => Ok(Self::Zstd(zstd::stream::write::Encoder::new(
                inner, ZSTD_LEVEL,
            )?)),
        }
    }

    /// Flush all pending data, close the encoding frame and return the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Self::Zstd(encoder) => {
                let mut w = encoder.finish()?;
                w.flush()?;
                Ok(w)
            }
        }
    }
}

impl<W: Write> Write for EncodedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Zstd(w) => w.flush(),
        }
    }
}

/// Wrap `inner` in a decoder for `strategy`.
pub fn decoding_reader<'a, R: Read + 'a>(
    strategy: CodecStrategy,
    inner: R,
) -> io::Result<Box<dyn Read + 'a>> {
    match strategy {
        CodecStrategy::Plain => Ok(Box::new(inner)),
        CodecStrategy::Zstd => Ok(Box::new(zstd::stream::read::Decoder::new(inner)?)),
    }
}
