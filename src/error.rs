//! Error types for encoding and decoding operations.

use std::fmt;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the codecs and image constructors.
///
/// Decoding never partially succeeds: a call either yields a fully decoded
/// image or fails with the kind describing the earliest violation found in
/// the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The stream does not start with the expected magic bytes.
    InvalidSignature,
    /// A PNG chunk's stored CRC-32 disagrees with the computed one.
    CrcMismatch {
        /// Four-byte chunk type the mismatch occurred in.
        chunk: [u8; 4],
    },
    /// A PNG scanline filter byte outside 0..=4.
    InvalidFilter(u8),
    /// Palette color type without a PLTE chunk.
    MissingPalette,
    /// The caller requested a pixel type the decoded image cannot losslessly
    /// promote to.
    IncompatiblePromotion {
        requested: &'static str,
        actual: &'static str,
    },
    /// A structural violation: bad marker sequence, bad segment length,
    /// invalid header field.
    MalformedStream(String),
    /// JPEG AC run-length decoding overran coefficient index 63.
    InvalidAc,
    /// An expected RSTn marker was absent at a restart boundary.
    MissingRestart,
    /// JPEG component count outside {1, 3}.
    UnsupportedComponents(u8),
    /// A recognized but unimplemented coding mode (progressive, arithmetic,
    /// 12-bit precision, ...).
    UnsupportedFeature(&'static str),
    /// The stream ended before all required data was read.
    Truncated,
    /// Zero width or height.
    InvalidDimensions { width: u32, height: u32 },
    /// Dimensions exceed the format or safety limit.
    ImageTooLarge { width: u32, height: u32, max: u32 },
    /// A raw buffer length does not match width * height * channels.
    InvalidDataLength { expected: usize, actual: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSignature => write!(f, "invalid file signature"),
            Error::CrcMismatch { chunk } => {
                write!(f, "CRC mismatch in {} chunk", String::from_utf8_lossy(chunk))
            }
            Error::InvalidFilter(filter) => write!(f, "invalid PNG filter type {filter}"),
            Error::MissingPalette => write!(f, "palette color type but no PLTE chunk"),
            Error::IncompatiblePromotion { requested, actual } => {
                write!(f, "cannot losslessly promote {actual} image to {requested}")
            }
            Error::MalformedStream(reason) => write!(f, "malformed stream: {reason}"),
            Error::InvalidAc => write!(f, "AC coefficient run overran block boundary"),
            Error::MissingRestart => write!(f, "expected restart marker not found"),
            Error::UnsupportedComponents(n) => {
                write!(f, "unsupported component count {n} (must be 1 or 3)")
            }
            Error::UnsupportedFeature(feature) => write!(f, "unsupported feature: {feature}"),
            Error::Truncated => write!(f, "stream ended before required data"),
            Error::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions {width}x{height}")
            }
            Error::ImageTooLarge { width, height, max } => {
                write!(f, "image too large: {width}x{height} (max dimension {max})")
            }
            Error::InvalidDataLength { expected, actual } => {
                write!(f, "invalid data length: expected {expected} bytes, got {actual}")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_chunk_type() {
        let err = Error::CrcMismatch { chunk: *b"IHDR" };
        assert!(err.to_string().contains("IHDR"));
    }

    #[test]
    fn display_mentions_promotion_types() {
        let err = Error::IncompatiblePromotion {
            requested: "Luma<u8>",
            actual: "Rgba<u8>",
        };
        let msg = err.to_string();
        assert!(msg.contains("Luma<u8>") && msg.contains("Rgba<u8>"));
    }
}
