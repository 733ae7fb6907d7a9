#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use secrecy::SecretString;
use shared::auth::Session;
use shared::{App, Effect, Model};

pub type Tester = AppTester<App, Effect>;

pub fn signed_in_model() -> Model {
    Model {
        session: Some(Session {
            token: SecretString::new("jwt-123".into()),
            user: None,
        }),
        session_checked: true,
        ..Model::default()
    }
}

/// A small real JPEG, so preview generation has something to decode.
pub fn jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 24, image::Rgb([120, 90, 60]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

pub fn http_requests(effects: Vec<Effect>) -> Vec<Request<HttpRequest>> {
    effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn find_request(effects: Vec<Effect>, path: &str) -> Option<Request<HttpRequest>> {
    http_requests(effects)
        .into_iter()
        .find(|r| r.operation.url.ends_with(path))
}

pub fn header<'a>(request: &'a Request<HttpRequest>, name: &str) -> Option<&'a str> {
    request
        .operation
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Answers a request with 200 and feeds the resulting events back into
/// the app, returning the effects they produced.
pub fn respond(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    body: &str,
) -> Vec<Effect> {
    respond_with(app, model, request, 200, body)
}

pub fn respond_with(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    status: u16,
    body: &str,
) -> Vec<Effect> {
    let response = HttpResponse::status(status)
        .body(body.as_bytes().to_vec())
        .build();
    let update = app
        .resolve(request, HttpResult::Ok(response))
        .expect("http request resolves");
    update
        .events
        .into_iter()
        .flat_map(|event| app.update(event, model).effects)
        .collect()
}
