use thiserror::Error;

/// Error type for codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding error: {0}")]
    Encode(String),
    #[error("Decoding error: {0}")]
    Decode(String),
    #[error("Unknown codec strategy: {0}. Available: plain, zstd")]
    UnknownStrategy(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
