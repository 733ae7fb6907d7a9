//! Photo evidence and the live camera session that produces it.

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::api::CaptureMeta;
use crate::capabilities::{CapturedImage, GeoReading, ImageFormat};
use crate::image_processing::Preview;
use crate::{CaptureId, ValidatedCoordinate, GPS_EXCELLENT_ACCURACY_M, GPS_FAIR_ACCURACY_M};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capture {
    pub id: CaptureId,
    #[serde(with = "serde_bytes")]
    pub image: Vec<u8>,
    pub format: ImageFormat,
    #[serde(with = "serde_bytes")]
    pub preview_jpeg: Vec<u8>,
    pub reading: Option<GeoReading>,
    pub captured_at: DateTime<Utc>,
}

impl Capture {
    #[must_use]
    pub fn new(
        image: CapturedImage,
        preview: Preview,
        reading: Option<GeoReading>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let format = image.format();
        Self {
            id: CaptureId::generate(),
            image: image.into_data(),
            format,
            preview_jpeg: preview.jpeg,
            reading,
            captured_at,
        }
    }

    #[must_use]
    pub fn coordinate(&self) -> Option<ValidatedCoordinate> {
        self.reading.map(|r| r.coordinate)
    }

    /// `10:30:45 AM` on the device clock.
    #[must_use]
    pub fn display_time(&self) -> String {
        self.display_time_in(&Local)
    }

    #[must_use]
    pub fn display_time_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.captured_at
            .with_timezone(tz)
            .format("%I:%M:%S %p")
            .to_string()
    }

    /// `2025-01-12T05:00:45.123Z`
    #[must_use]
    pub fn iso_time(&self) -> String {
        self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    #[must_use]
    pub fn size_label(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let kb = self.image.len() as f64 / 1024.0;
        format!("{kb:.1} KB")
    }

    #[must_use]
    pub fn location_label(&self) -> String {
        self.coordinate()
            .map_or_else(|| "No Location Data".to_string(), ValidatedCoordinate::display)
    }

    #[must_use]
    pub fn meta(&self) -> CaptureMeta {
        CaptureMeta {
            lat: self.reading.map(|r| r.coordinate.lat()),
            lng: self.reading.map(|r| r.coordinate.lng()),
            accuracy: self.reading.map(|r| r.accuracy_m),
            timestamp: self.display_time(),
            iso_time: self.iso_time(),
        }
    }
}

/// Fix quality shown over the viewfinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "accuracy_m", rename_all = "snake_case")]
pub enum GpsSignal {
    Searching,
    Excellent(u32),
    Fair(u32),
    Poor(u32),
}

impl GpsSignal {
    #[must_use]
    pub const fn from_reading(reading: Option<GeoReading>) -> Self {
        match reading {
            None => Self::Searching,
            Some(GeoReading { accuracy_m, .. }) if accuracy_m < GPS_EXCELLENT_ACCURACY_M => {
                Self::Excellent(accuracy_m)
            }
            Some(GeoReading { accuracy_m, .. }) if accuracy_m < GPS_FAIR_ACCURACY_M => {
                Self::Fair(accuracy_m)
            }
            Some(GeoReading { accuracy_m, .. }) => Self::Poor(accuracy_m),
        }
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Searching => "Searching...".into(),
            Self::Excellent(m) => format!("Excellent ({m}m)"),
            Self::Fair(m) => format!("Fair ({m}m)"),
            Self::Poor(m) => format!("Poor ({m}m) - Wait..."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraStatus {
    #[default]
    Opening,
    Live,
    Capturing,
}

/// An open viewfinder with its location watch. Dropping the session from
/// the model must be paired with closing both streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSession {
    pub status: CameraStatus,
    pub latest_reading: Option<GeoReading>,
}

impl CameraSession {
    #[must_use]
    pub fn opening() -> Self {
        Self::default()
    }

    /// The watch keeps a single slot; each reading replaces the last.
    pub fn record(&mut self, reading: GeoReading) {
        self.latest_reading = Some(reading);
    }

    #[must_use]
    pub const fn signal(&self) -> GpsSignal {
        GpsSignal::from_reading(self.latest_reading)
    }

    /// Only a fix inside the excellent band counts as a lock.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(
            self.latest_reading,
            Some(GeoReading { accuracy_m, .. }) if accuracy_m < GPS_EXCELLENT_ACCURACY_M
        )
    }

    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        if self.is_locked() {
            "Target Locked. Ready."
        } else {
            "Calibrating GPS..."
        }
    }

    #[must_use]
    pub const fn can_shoot(&self) -> bool {
        matches!(self.status, CameraStatus::Live)
    }
}
