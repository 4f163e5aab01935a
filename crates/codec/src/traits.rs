use crate::error::CodecError;

/// Core trait for output codecs.
///
/// Every strategy must be able to:
/// 1.  `encode`: Take raw alignment bytes and turn them into the on-disk representation.
/// 2.  `decode`: Take the on-disk representation and turn it back into the raw bytes.
///
/// Streaming counterparts live in [`crate::stream`].
pub trait Codec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// File name suffix appended after the alignment extension (may be empty).
    fn extension(&self) -> &'static str;
}
