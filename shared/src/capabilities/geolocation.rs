use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, CoordinateError, ErrorKind, ValidatedCoordinate};

/// Device position: a continuous watch while the camera is open, or a
/// one-shot read for the location step.
pub struct Geolocation<Ev> {
    context: CapabilityContext<GeolocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = GeolocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geolocation::new(self.context.map_event(f))
    }
}

impl<Ev> Geolocation<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<GeolocationOperation, Ev>) -> Self {
        Self { context }
    }

    /// Every reading the shell pushes becomes one event, until the shell
    /// ends the stream after `clear_watch`.
    pub fn watch<F>(&self, options: PositionOptions, make_event: F)
    where
        F: Fn(GeolocationResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut readings = ctx.stream_from_shell(GeolocationOperation::Watch { options });
            while let Some(reading) = readings.next().await {
                ctx.update_app(make_event(reading));
            }
        });
    }

    pub fn clear_watch(&self) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(GeolocationOperation::ClearWatch).await;
        });
    }

    pub fn current_position<F>(&self, options: PositionOptions, make_event: F)
    where
        F: FnOnce(GeolocationResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(GeolocationOperation::CurrentPosition { options })
                .await;
            ctx.update_app(make_event(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationOperation {
    Watch { options: PositionOptions },
    CurrentPosition { options: PositionOptions },
    ClearWatch,
}

impl Operation for GeolocationOperation {
    type Output = GeolocationResult;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub maximum_age_ms: u32,
}

impl PositionOptions {
    #[must_use]
    pub const fn high_accuracy() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age_ms: 0,
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::high_accuracy()
    }
}

/// One fix as reported by the device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: f64,
}

/// A fix that passed range checks, with accuracy rounded to whole metres.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoReading {
    pub coordinate: ValidatedCoordinate,
    pub accuracy_m: u32,
}

impl TryFrom<Position> for GeoReading {
    type Error = CoordinateError;

    fn try_from(p: Position) -> Result<Self, Self::Error> {
        let coordinate = ValidatedCoordinate::new(p.lat, p.lng)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let accuracy_m = if p.accuracy_m.is_finite() && p.accuracy_m > 0.0 {
            p.accuracy_m.round().min(f64::from(u32::MAX)) as u32
        } else {
            0
        };
        Ok(Self {
            coordinate,
            accuracy_m,
        })
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {reason}")]
    PositionUnavailable { reason: String },

    #[error("timed out waiting for a position")]
    Timeout,

    #[error("geolocation not supported on this device")]
    NotSupported,
}

impl GeolocationError {
    #[must_use]
    pub const fn is_permission_error(&self) -> bool {
        matches!(self, GeolocationError::PermissionDenied)
    }
}

impl From<GeolocationError> for AppError {
    fn from(e: GeolocationError) -> Self {
        let kind = if e.is_permission_error() {
            ErrorKind::LocationPermissionDenied
        } else {
            ErrorKind::Location
        };
        AppError::new(kind, e.to_string())
    }
}

pub type GeolocationResult = Result<Position, GeolocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_rounds_accuracy() {
        let reading = GeoReading::try_from(Position {
            lat: 12.9716,
            lng: 77.5946,
            accuracy_m: 14.6,
        })
        .unwrap();
        assert_eq!(reading.accuracy_m, 15);
        assert_eq!(reading.coordinate.lat(), 12.9716);
    }

    #[test]
    fn test_reading_rejects_bad_coordinates() {
        assert!(GeoReading::try_from(Position {
            lat: 123.0,
            lng: 0.0,
            accuracy_m: 5.0,
        })
        .is_err());
    }

    #[test]
    fn test_reading_tolerates_bad_accuracy() {
        let reading = GeoReading::try_from(Position {
            lat: 0.0,
            lng: 0.0,
            accuracy_m: f64::NAN,
        })
        .unwrap();
        assert_eq!(reading.accuracy_m, 0);
    }

    #[test]
    fn test_error_mapping() {
        let denied: AppError = GeolocationError::PermissionDenied.into();
        assert_eq!(denied.kind, ErrorKind::LocationPermissionDenied);
        let timeout: AppError = GeolocationError::Timeout.into();
        assert_eq!(timeout.kind, ErrorKind::Location);
    }

    #[test]
    fn test_default_options_are_high_accuracy() {
        assert!(PositionOptions::default().enable_high_accuracy);
    }
}
