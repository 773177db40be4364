//! Error types for blob encoding and decoding.

use thiserror::Error;

/// Errors that can occur while converting blobs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The blob could not be encoded with any supported format.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// The bytes could not be decoded.
    #[error("Decoding failed: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_display() {
        assert_eq!(
            CodecError::Decode("truncated".into()).to_string(),
            "Decoding failed: truncated"
        );
        assert_eq!(
            CodecError::Encode("bad".into()).to_string(),
            "Encoding failed: bad"
        );
    }
}
