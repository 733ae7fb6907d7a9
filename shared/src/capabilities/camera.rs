use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind, CAPTURE_JPEG_QUALITY, MAX_IMAGE_BYTES};

pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

/// Live camera session driven by the shell: open a stream, grab frames from
/// it, close it again.
pub struct Camera<Ev> {
    context: CapabilityContext<CameraOperation, Ev>,
}

impl<Ev> Capability<Ev> for Camera<Ev> {
    type Operation = CameraOperation;
    type MappedSelf<MappedEv> = Camera<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Camera::new(self.context.map_event(f))
    }
}

impl<Ev> Camera<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<CameraOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn open<F>(&self, facing: CameraFacing, make_event: F)
    where
        F: FnOnce(CameraResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(CameraOperation::Open { facing }).await;
            ctx.update_app(make_event(result));
        });
    }

    pub fn capture<F>(&self, config: CaptureConfig, make_event: F)
    where
        F: FnOnce(CameraResult) -> Ev + Send + 'static,
    {
        let config = config.validated();
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(CameraOperation::Capture { config })
                .await;
            ctx.update_app(make_event(result));
        });
    }

    /// Stops every track of the open stream. Fire and forget.
    pub fn close(&self) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(CameraOperation::Close).await;
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraOperation {
    Open { facing: CameraFacing },
    Capture { config: CaptureConfig },
    Close,
}

impl Operation for CameraOperation {
    type Output = CameraResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CameraFacing {
    Front,
    /// `facingMode: environment`
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureConfig {
    pub format: ImageFormat,
    pub quality: u8,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: CAPTURE_JPEG_QUALITY,
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn validated(mut self) -> Self {
        self.quality = self.quality.min(100);
        self.max_width = self.max_width.max(1);
        self.max_height = self.max_height.max(1);
        self
    }
}

/// A frame grabbed from the live stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturedImage {
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn new(
        data: Vec<u8>,
        format: ImageFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, CameraError> {
        Self {
            data,
            format,
            width,
            height,
        }
        .checked()
    }

    /// Shell-delivered frames skip `new`, so they are re-checked on arrival.
    pub fn checked(self) -> Result<Self, CameraError> {
        let Self { data, format, .. } = &self;
        if data.is_empty() {
            return Err(CameraError::InvalidImage {
                reason: "image data is empty".to_string(),
            });
        }

        if data.len() > MAX_IMAGE_BYTES {
            return Err(CameraError::ImageTooLarge {
                size: data.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        if let Some(detected) = ImageFormat::from_magic_bytes(data) {
            if detected != *format {
                return Err(CameraError::InvalidImage {
                    reason: format!("format mismatch: declared {format:?} but detected {detected:?}"),
                });
            }
        }

        Ok(self)
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraOutput {
    Opened,
    Photo(CapturedImage),
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("no camera stream is open")]
    NotOpen,

    #[error("capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("image too large: {size} bytes exceeds maximum of {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },
}

impl From<CameraError> for AppError {
    fn from(e: CameraError) -> Self {
        let kind = match &e {
            CameraError::PermissionDenied | CameraError::Unavailable { .. } => {
                ErrorKind::CameraPermissionDenied
            }
            CameraError::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
            CameraError::InvalidImage { .. } => ErrorKind::ImageProcessing,
            CameraError::NotOpen | CameraError::CaptureFailed { .. } => ErrorKind::Camera,
        };
        AppError::new(kind, e.to_string())
    }
}

pub type CameraResult = Result<CameraOutput, CameraError>;

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEADER: [u8; 12] = [
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ];

    #[test]
    fn test_image_format_detection() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_HEADER),
            Some(ImageFormat::Jpeg)
        );
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert_eq!(ImageFormat::from_magic_bytes(&png), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_magic_bytes(&[0xFF, 0xD8]), None);
        assert_eq!(ImageFormat::from_magic_bytes(&[0u8; 12]), None);
    }

    #[test]
    fn test_capture_config_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.format, ImageFormat::Jpeg);
        assert_eq!(config.quality, 80);
    }

    #[test]
    fn test_capture_config_validation() {
        let config = CaptureConfig {
            max_width: 0,
            max_height: 0,
            ..CaptureConfig::default().with_quality(150)
        }
        .validated();
        assert_eq!(config.quality, 100);
        assert_eq!((config.max_width, config.max_height), (1, 1));
    }

    #[test]
    fn test_captured_image_valid() {
        let image = CapturedImage::new(JPEG_HEADER.to_vec(), ImageFormat::Jpeg, 640, 480).unwrap();
        assert_eq!(image.dimensions(), (640, 480));
        assert_eq!(image.format().mime_type(), "image/jpeg");
    }

    #[test]
    fn test_captured_image_empty() {
        assert!(matches!(
            CapturedImage::new(vec![], ImageFormat::Jpeg, 1, 1),
            Err(CameraError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_captured_image_format_mismatch() {
        assert!(matches!(
            CapturedImage::new(JPEG_HEADER.to_vec(), ImageFormat::Png, 1, 1),
            Err(CameraError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_permission_errors_block() {
        for e in [
            CameraError::PermissionDenied,
            CameraError::Unavailable { reason: "no device".into() },
        ] {
            let err: AppError = e.into();
            assert_eq!(err.kind, ErrorKind::CameraPermissionDenied);
            assert_eq!(
                err.user_facing_message(),
                "Unable to access camera. Please allow permissions."
            );
        }
        let err: AppError = CameraError::NotOpen.into();
        assert_eq!(err.kind, ErrorKind::Camera);
    }

    #[test]
    fn test_delivered_frame_is_rechecked() {
        let image: CapturedImage = serde_json::from_value(serde_json::json!({
            "data": [],
            "format": "Jpeg",
            "width": 1,
            "height": 1
        }))
        .unwrap();
        assert!(matches!(image.checked(), Err(CameraError::InvalidImage { .. })));
    }
}
