//! Runtime configuration handed to the core by the shell at start-up.
//!
//! Shells read these values from their own environment (for the web shell,
//! the bundler's `VITE_API_BASE_URL`) and pass them in `Event::AppStarted`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{AppError, ErrorKind};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";
pub const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOCODER_USER_AGENT: &str = "Civira-Report-App/1.0";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} must use http or https, got {scheme}")]
    UnsupportedScheme { field: &'static str, scheme: String },

    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("cannot build endpoint for path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub api_base_url: String,
    pub geocoder_base_url: String,
    pub geocoder_user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            geocoder_base_url: DEFAULT_GEOCODER_BASE_URL.into(),
            geocoder_user_agent: DEFAULT_GEOCODER_USER_AGENT.into(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_base("api_base_url", &self.api_base_url)?;
        parse_base("geocoder_base_url", &self.geocoder_base_url)?;
        if self.geocoder_user_agent.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "geocoder_user_agent",
            });
        }
        Ok(())
    }

    /// Resolves a backend path such as `/api/user/profile` against the API
    /// base. A base with a path prefix (`https://host/v1`) keeps the prefix.
    pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
        join(parse_base("api_base_url", &self.api_base_url)?, path)
    }

    pub fn geocoder_url(&self, path: &str) -> Result<Url, ConfigError> {
        join(parse_base("geocoder_base_url", &self.geocoder_base_url)?, path)
    }
}

fn parse_base(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { field });
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::UnsupportedScheme {
                field,
                scheme: other.to_string(),
            })
        }
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: "missing host".into(),
        });
    }

    Ok(url)
}

fn join(mut base: Url, path: &str) -> Result<Url, ConfigError> {
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ConfigError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_api_url_join() {
        let config = AppConfig {
            api_base_url: "https://api.civira.test".into(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.api_url("/api/auth/login").unwrap().as_str(),
            "https://api.civira.test/api/auth/login"
        );
    }

    #[test]
    fn test_api_url_keeps_prefix() {
        let config = AppConfig {
            api_base_url: "https://host.test/backend/".into(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.api_url("api/user/profile").unwrap().as_str(),
            "https://host.test/backend/api/user/profile"
        );

        let config = AppConfig {
            api_base_url: "https://host.test/backend".into(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.api_url("/api/user/profile").unwrap().as_str(),
            "https://host.test/backend/api/user/profile"
        );
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let config = AppConfig {
            api_base_url: "ftp://files.test".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme { field: "api_base_url", .. })
        ));
    }

    #[test]
    fn test_rejects_empty() {
        let config = AppConfig {
            geocoder_user_agent: "  ".into(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Empty {
                field: "geocoder_user_agent"
            })
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig =
            serde_json::from_str(r#"{"apiBaseUrl":"https://api.civira.test"}"#).unwrap();
        assert_eq!(config.api_base_url, "https://api.civira.test");
        assert_eq!(config.geocoder_base_url, DEFAULT_GEOCODER_BASE_URL);
    }
}
