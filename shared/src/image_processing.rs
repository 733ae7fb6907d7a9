use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageReader, Limits};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::capabilities::ImageFormat;
use crate::{AppError, ErrorKind, MAX_IMAGE_BYTES, MAX_IMAGE_DIMENSION, PREVIEW_MAX_DIMENSION};

pub const PREVIEW_JPEG_QUALITY: u8 = 70;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("input bytes empty")]
    EmptyInput,

    #[error("input too large: {size} bytes, max {max_size}")]
    InputTooLarge { size: usize, max_size: usize },

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode preview: {0}")]
    Encode(String),
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        let kind = match e {
            ImageError::InputTooLarge { .. } => ErrorKind::ImageTooLarge,
            ImageError::UnsupportedFormat => ErrorKind::ImageFormatUnsupported,
            ImageError::EmptyInput | ImageError::Decode(_) | ImageError::Encode(_) => {
                ErrorKind::ImageProcessing
            }
        };
        AppError::new(kind, e.to_string())
    }
}

/// A downscaled JPEG of a capture, small enough to inline in the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Preview {
    #[must_use]
    pub fn data_url(&self) -> String {
        data_url("image/jpeg", &self.jpeg)
    }
}

#[must_use]
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Checks size and signature before any decoding work.
pub fn sniff(raw_bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if raw_bytes.is_empty() {
        return Err(ImageError::EmptyInput);
    }
    if raw_bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::InputTooLarge {
            size: raw_bytes.len(),
            max_size: MAX_IMAGE_BYTES,
        });
    }
    match ImageFormat::from_magic_bytes(raw_bytes) {
        Some(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        _ => Err(ImageError::UnsupportedFormat),
    }
}

#[instrument(skip(raw_bytes), fields(input_size = raw_bytes.len()))]
pub fn make_preview(raw_bytes: &[u8]) -> Result<Preview, ImageError> {
    sniff(raw_bytes)?;
    let img = decode_image(raw_bytes)?;

    let thumb = if img.width() > PREVIEW_MAX_DIMENSION || img.height() > PREVIEW_MAX_DIMENSION {
        img.thumbnail(PREVIEW_MAX_DIMENSION, PREVIEW_MAX_DIMENSION)
    } else {
        img
    };

    let (width, height) = thumb.dimensions();
    let jpeg = encode_jpeg(&thumb, PREVIEW_JPEG_QUALITY)?;
    debug!(width, height, output_size = jpeg.len(), "preview generated");

    Ok(Preview {
        jpeg,
        width,
        height,
    })
}

fn decode_image(raw_bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);

    let mut reader = ImageReader::new(Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(ImageError::UnsupportedFormat);
    }

    reader.limits(limits);
    reader.decode().map_err(|e| ImageError::Decode(e.to_string()))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageBuffer, Rgb};

    use super::encode_jpeg;

    pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        encode_jpeg(&image::DynamicImage::ImageRgb8(img), 90).expect("encode test jpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::jpeg;
    use super::*;

    #[test]
    fn sniff_rejects_empty() {
        assert_eq!(sniff(&[]), Err(ImageError::EmptyInput));
    }

    #[test]
    fn sniff_rejects_garbage() {
        assert_eq!(sniff(&[0u8; 64]), Err(ImageError::UnsupportedFormat));
    }

    #[test]
    fn sniff_rejects_oversized_input() {
        let mut big = vec![0xFF, 0xD8, 0xFF, 0xE0];
        big.resize(MAX_IMAGE_BYTES + 1, 0);
        assert!(matches!(sniff(&big), Err(ImageError::InputTooLarge { .. })));
    }

    #[test]
    fn preview_downscales_large_capture() {
        let preview = make_preview(&jpeg(1280, 960)).unwrap();
        assert_eq!(preview.width, PREVIEW_MAX_DIMENSION);
        assert_eq!(preview.height, 240);
        assert_eq!(ImageFormat::from_magic_bytes(&preview.jpeg), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn preview_keeps_small_capture_size() {
        let preview = make_preview(&jpeg(64, 48)).unwrap();
        assert_eq!((preview.width, preview.height), (64, 48));
    }

    #[test]
    fn data_url_prefix() {
        assert_eq!(data_url("image/jpeg", b"abc"), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn truncated_jpeg_fails_to_decode() {
        let mut bytes = jpeg(32, 32);
        bytes.truncate(40);
        assert!(matches!(make_preview(&bytes), Err(ImageError::Decode(_))));
    }

    #[test]
    fn error_kinds() {
        let err: AppError = ImageError::UnsupportedFormat.into();
        assert_eq!(err.kind, ErrorKind::ImageFormatUnsupported);
    }
}
