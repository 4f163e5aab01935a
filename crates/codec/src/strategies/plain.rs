use crate::error::CodecError;
use crate::traits::Codec;

/// Strategy: plain text, bytes are written unchanged.
pub struct Plain;

impl Codec for Plain {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn extension(&self) -> &'static str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_identity() {
        let text = b"2 4\nA ACGT\nB ACGA\n";
        let encoded = Plain.encode(text).unwrap();
        assert_eq!(encoded, text);
        assert_eq!(Plain.decode(&encoded).unwrap(), text);
    }

    #[test]
    fn test_plain_empty() {
        assert!(Plain.encode(&[]).unwrap().is_empty());
    }
}
