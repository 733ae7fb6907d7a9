use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind};

pub use crux_kv::error::KeyValueError;

pub const MAX_KEY_LENGTH: usize = 512;
pub const SESSION_TOKEN_KEY: &str = "CIVIRA_token";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    /// Where the bearer token lives between launches.
    #[must_use]
    pub fn session_token() -> Self {
        Self {
            namespace: KeyNamespace::Session,
            key: SESSION_TOKEN_KEY.to_string(),
        }
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }

        if key.len() > MAX_KEY_LENGTH {
            return Err(KvError::InvalidKey {
                key: key.chars().take(50).collect::<String>() + "...",
                reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
            });
        }

        if key.chars().any(char::is_control) {
            return Err(KvError::InvalidKey {
                key: key.escape_default().to_string(),
                reason: "key contains control characters".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Session,
    Settings,
}

impl KeyNamespace {
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            KeyNamespace::Session => "session",
            KeyNamespace::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("failed to encode stored value: {0}")]
    Encode(String),

    #[error("failed to decode stored value: {0}")]
    Decode(String),

    #[error("stored session has an empty token")]
    EmptyToken,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<KvError> for AppError {
    fn from(e: KvError) -> Self {
        AppError::new(ErrorKind::Storage, e.to_string())
    }
}

/// Outcome of a get, set or delete; set and delete carry the previous value.
pub type KvResult = Result<Option<Vec<u8>>, KeyValueError>;

/// Persisted session record, CBOR encoded.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    saved_at_ms: u64,
}

pub fn encode_session(token: &SecretString, saved_at_ms: u64) -> Result<Vec<u8>, KvError> {
    let record = StoredSession {
        token: token.expose_secret().clone(),
        saved_at_ms,
    };
    let mut bytes = Vec::new();
    ciborium::into_writer(&record, &mut bytes).map_err(|e| KvError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Returns the token and the time it was saved.
pub fn decode_session(bytes: &[u8]) -> Result<(SecretString, u64), KvError> {
    let record: StoredSession =
        ciborium::from_reader(bytes).map_err(|e| KvError::Decode(e.to_string()))?;
    if record.token.trim().is_empty() {
        return Err(KvError::EmptyToken);
    }
    Ok((SecretString::new(record.token), record.saved_at_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key() {
        assert_eq!(KvKey::session_token().raw(), "session:CIVIRA_token");
    }

    #[test]
    fn test_key_validation() {
        assert!(KvKey::new(KeyNamespace::Settings, "theme").is_ok());
        assert!(KvKey::new(KeyNamespace::Settings, "  ").is_err());
        assert!(KvKey::new(KeyNamespace::Settings, "a\0b").is_err());
        assert!(KvKey::new(KeyNamespace::Settings, "x".repeat(MAX_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_session_record() {
        let token = SecretString::new("jwt.payload.sig".to_string());
        let bytes = encode_session(&token, 1_700_000_000_000).unwrap();

        let (decoded, saved_at) = decode_session(&bytes).unwrap();
        assert_eq!(decoded.expose_secret(), "jwt.payload.sig");
        assert_eq!(saved_at, 1_700_000_000_000);
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty() {
        assert!(matches!(decode_session(b"\xff\xff"), Err(KvError::Decode(_))));

        let bytes = encode_session(&SecretString::new(String::new()), 0).unwrap();
        assert_eq!(decode_session(&bytes).unwrap_err(), KvError::EmptyToken);
    }
}
