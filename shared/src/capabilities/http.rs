use crux_http::{HttpError, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::{AppError, ErrorKind};

/// Every backend call is sent without a typed expectation; bodies are
/// decoded by the handler that owns the endpoint.
pub type HttpResult = crux_http::Result<Response<Vec<u8>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Multipart { boundary: String },
}

impl ContentType {
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            ContentType::Json => "application/json".to_string(),
            ContentType::Multipart { boundary } => {
                format!("multipart/form-data; boundary={boundary}")
            }
        }
    }
}

#[must_use]
pub fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

/// Splits a completed request into a success body or an `AppError`.
/// Non-2xx statuses are mapped whether the HTTP client surfaces them as a
/// response or as an error.
pub fn into_body(result: HttpResult) -> Result<Vec<u8>, AppError> {
    match result {
        Ok(mut response) => {
            let status = response.status();
            let body = response.take_body().unwrap_or_default();
            if status.is_success() {
                Ok(body)
            } else {
                Err(AppError::from_http_status(u16::from(status), Some(&body)))
            }
        }
        Err(HttpError::Http { code, body, .. }) => {
            Err(AppError::from_http_status(u16::from(code), body.as_deref()))
        }
        Err(other) => {
            warn!(error = %other, "request did not complete");
            Err(AppError::new(ErrorKind::Network, "Network error").with_internal(other.to_string()))
        }
    }
}
