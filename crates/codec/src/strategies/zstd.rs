use crate::error::CodecError;
use crate::traits::Codec;

/// Compression level used for alignments (zstd's default).
pub(crate) const ZSTD_LEVEL: i32 = 3;

/// Strategy: a single standard zstd frame.
///
/// # How it works
///
/// The alignment text is compressed as one zstd frame without any extra
/// header, so the resulting file can be read with the stock `zstd -d` tool.
/// [`crate::stream::EncodedWriter`] produces the same frame format leaf by leaf.
pub struct Zstd;

impl Codec for Zstd {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::stream::encode_all(std::io::Cursor::new(data), ZSTD_LEVEL)
            .map_err(|e| CodecError::Encode(format!("Zstd compression failed: {e}")))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        // `decode_all` handles frames without a recorded content size, which is
        // what the streaming encoder produces.
        zstd::stream::decode_all(std::io::Cursor::new(data))
            .map_err(|e| CodecError::Decode(format!("Zstd decompression failed: {e}")))
    }

    fn extension(&self) -> &'static str {
        ".zst"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_zstd_round_trip() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        for _ in 0..5 {
            let len = rng.random_range(100..1000);
            let input: Vec<u8> = (0..len).map(|_| b"ACGT"[rng.random_range(0..4)]).collect();
            let encoded = Zstd.encode(&input).expect("Encode failed");
            let decoded = Zstd.decode(&encoded).expect("Decode failed");
            assert_eq!(decoded, input);
        }
    }

    #[test]
    fn test_compression_efficiency_repetitive() {
        let len = 10_000;
        let input = vec![b'A'; len];
        let encoded = Zstd.encode(&input).expect("Encode failed");

        assert!(
            encoded.len() < len / 10,
            "Should achieve >10x compression on a constant alignment row"
        );
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(Zstd.decode(b"definitely not zstd").is_err());
    }
}
