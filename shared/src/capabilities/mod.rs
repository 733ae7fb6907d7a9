mod camera;
mod geolocation;
pub mod http;
pub mod kv;

pub use self::camera::{
    CameraError, CameraFacing, CameraOperation, CameraOutput, CameraResult, CaptureConfig,
    CapturedImage, ImageFormat,
};
pub use self::geolocation::{
    GeoReading, GeolocationError, GeolocationOperation, GeolocationResult, Position,
    PositionOptions,
};
pub use self::http::HttpResult;
pub use self::kv::{KvError, KvKey, KvResult};

pub use self::camera::Camera;
pub use self::geolocation::Geolocation;
pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub camera: Camera<Event>,
    pub geolocation: Geolocation<Event>,
}
