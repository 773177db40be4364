//! Blob codecs.
//!
//! The cache treats stored data as opaque bytes. A [`BlobCodec`] converts
//! between those bytes and the decoded blob kept in the memory tier, so the
//! cache never needs to know the image format.
//!
//! ```text
//! put:  Blob ──encode(hint)──► bytes ──► disk
//! get:  disk ──► bytes ──decode──► Blob ──► memory
//! ```
//!
//! # Available Codecs
//!
//! - [`ImageCodec`] - `image::DynamicImage`, JPEG when a lossy hint is given
//!   with a PNG fallback
//! - [`RawCodec`] - identity codec over `Vec<u8>`

mod error;
mod raster;

pub use error::CodecError;
pub use raster::{ImageCodec, DEFAULT_JPEG_QUALITY};

/// Caller-supplied preference for how a blob should be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeHint {
    /// Prefer a lossless encoding.
    Lossless,
    /// Prefer a lossy encoding at the given quality (1-100).
    Lossy { quality: u8 },
}

impl EncodeHint {
    /// Pick a hint from a file extension: JPEG extensions are lossy, anything
    /// else is lossless.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => EncodeHint::Lossy {
                quality: DEFAULT_JPEG_QUALITY,
            },
            _ => EncodeHint::Lossless,
        }
    }
}

/// Converts blobs to and from their stored byte form.
pub trait BlobCodec: Send + Sync + 'static {
    /// The decoded representation held in memory.
    type Blob: Send + Sync + 'static;

    /// Encode a blob. Implementations may fall back to a lossless encoding
    /// when the hint is absent or the preferred encoding fails.
    fn encode(&self, blob: &Self::Blob, hint: Option<EncodeHint>) -> Result<Vec<u8>, CodecError>;

    /// Decode stored bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Blob, CodecError>;
}

/// Identity codec: the blob is the byte vector itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl BlobCodec for RawCodec {
    type Blob = Vec<u8>;

    fn encode(&self, blob: &Vec<u8>, _hint: Option<EncodeHint>) -> Result<Vec<u8>, CodecError> {
        Ok(blob.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}
