mod plain;
mod zstd;

pub use self::plain::Plain;
pub use self::zstd::Zstd;
pub(crate) use self::zstd::ZSTD_LEVEL;
