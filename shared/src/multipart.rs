//! `multipart/form-data` bodies for complaint submission, image validation
//! and profile updates. The HTTP capability only carries raw bytes, so the
//! body is assembled here.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::capabilities::http::ContentType;
use crate::{AppError, ErrorKind};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("invalid field name {name:?}")]
    InvalidFieldName { name: String },

    #[error("invalid file name {filename:?}")]
    InvalidFileName { filename: String },

    #[error("failed to encode JSON part {name}: {reason}")]
    Json { name: String, reason: String },
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::new(ErrorKind::Serialization, "Could not prepare the upload")
            .with_internal(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(format!("----CiviraFormBoundary{}", Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    #[must_use]
    pub fn content_type(&self) -> String {
        ContentType::Multipart {
            boundary: self.boundary.clone(),
        }
        .header_value()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn text(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, MultipartError> {
        let name = checked_field_name(name.into())?;
        self.parts.push(Part::Text {
            name,
            value: value.into(),
        });
        Ok(self)
    }

    /// Adds a text part holding `value` encoded as JSON.
    pub fn json<T: Serialize + ?Sized>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, MultipartError> {
        let name = name.into();
        let encoded = serde_json::to_string(value).map_err(|e| MultipartError::Json {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        self.text(name, encoded)
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self, MultipartError> {
        let name = checked_field_name(name.into())?;
        let filename = filename.into();
        if filename.is_empty() || filename.contains(['"', '\r', '\n', '/', '\\']) {
            return Err(MultipartError::InvalidFileName { filename });
        }
        self.parts.push(Part::File {
            name,
            filename,
            content_type: content_type.into(),
            data,
        });
        Ok(self)
    }

    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        let payload: usize = self
            .parts
            .iter()
            .map(|p| match p {
                Part::Text { value, .. } => value.len(),
                Part::File { data, .. } => data.len(),
            })
            .sum();
        let mut body = Vec::with_capacity(payload + self.parts.len() * 128 + 64);

        for part in self.parts {
            body.extend_from_slice(b"--");
            body.extend_from_slice(self.boundary.as_bytes());
            body.extend_from_slice(CRLF);

            match part {
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"").as_bytes(),
                    );
                    body.extend_from_slice(CRLF);
                    body.extend_from_slice(CRLF);
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\""
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(CRLF);
                    body.extend_from_slice(format!("Content-Type: {content_type}").as_bytes());
                    body.extend_from_slice(CRLF);
                    body.extend_from_slice(CRLF);
                    body.extend_from_slice(&data);
                }
            }
            body.extend_from_slice(CRLF);
        }

        body.extend_from_slice(b"--");
        body.extend_from_slice(self.boundary.as_bytes());
        body.extend_from_slice(b"--");
        body.extend_from_slice(CRLF);
        body
    }
}

fn checked_field_name(name: String) -> Result<String, MultipartError> {
    if name.is_empty() || name.contains(['"', '\r', '\n']) {
        return Err(MultipartError::InvalidFieldName { name });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_text(form: MultipartForm) -> String {
        String::from_utf8(form.into_body()).unwrap()
    }

    #[test]
    fn test_text_and_file_layout() {
        let form = MultipartForm::with_boundary("XYZ")
            .text("gender", "Female")
            .unwrap()
            .file("images", "evidence_0.jpg", "image/jpeg", b"JPEGDATA".to_vec())
            .unwrap();

        let expected = "--XYZ\r\n\
             Content-Disposition: form-data; name=\"gender\"\r\n\r\n\
             Female\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"images\"; filename=\"evidence_0.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             JPEGDATA\r\n\
             --XYZ--\r\n";
        assert_eq!(body_text(form), expected);
    }

    #[test]
    fn test_json_part() {
        let form = MultipartForm::with_boundary("B")
            .json("address", "12 MG Road")
            .unwrap();
        assert!(body_text(form).contains("\r\n\r\n\"12 MG Road\"\r\n"));
    }

    #[test]
    fn test_empty_form_is_terminated() {
        let form = MultipartForm::with_boundary("B");
        assert!(form.is_empty());
        assert_eq!(body_text(form), "--B--\r\n");
    }

    #[test]
    fn test_rejects_header_injection() {
        assert_eq!(
            MultipartForm::new().text("bad\r\nname", "x").unwrap_err(),
            MultipartError::InvalidFieldName {
                name: "bad\r\nname".into()
            }
        );
        assert!(matches!(
            MultipartForm::new().file("images", "a\"b.jpg", "image/jpeg", vec![]),
            Err(MultipartError::InvalidFileName { .. })
        ));
    }

    #[test]
    fn test_content_type_carries_boundary() {
        let form = MultipartForm::new();
        assert_eq!(
            form.content_type(),
            format!("multipart/form-data; boundary={}", form.boundary())
        );
        assert!(form.boundary().starts_with("----CiviraFormBoundary"));
    }
}
