//! Raster image codec backed by the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::{BlobCodec, CodecError, EncodeHint};

/// JPEG quality used when a lossy encoding is requested without a quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Codec for decoded raster images.
///
/// Encodes to JPEG when given [`EncodeHint::Lossy`] and to PNG otherwise. If
/// JPEG encoding fails (e.g. the colour type is not representable) the image
/// is stored as PNG instead. Decoding sniffs the format from the bytes, so
/// the file extension never has to match the stored encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        image
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buffer)
    }
}

impl BlobCodec for ImageCodec {
    type Blob = DynamicImage;

    fn encode(&self, image: &DynamicImage, hint: Option<EncodeHint>) -> Result<Vec<u8>, CodecError> {
        match hint {
            Some(EncodeHint::Lossy { quality }) => Self::encode_jpeg(image, quality)
                .or_else(|e| {
                    debug!(error = %e, "JPEG encoding failed, falling back to PNG");
                    Self::encode_png(image)
                }),
            Some(EncodeHint::Lossless) | None => Self::encode_png(image),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
