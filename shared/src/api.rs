//! Backend endpoints and wire bodies.
//!
//! The backend owns these schemas; the types here accept what it sends
//! (`_id` or `id`, `userData` or `user`) and default everything optional.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::complaints::{Complaint, ComplaintDetail};
use crate::notifications::Notification;
use crate::profile::UserProfile;
use crate::{AppError, ErrorKind};

pub mod endpoints {
    use crate::{ComplaintId, NotificationId};

    pub const REGISTER: &str = "/api/auth/register";
    pub const LOGIN: &str = "/api/auth/login";
    pub const FORGOT_PASSWORD: &str = "/api/auth/forgot-password";
    pub const VERIFY_OTP: &str = "/api/auth/verify-otp";
    pub const RESET_PASSWORD: &str = "/api/auth/reset-password";
    pub const GOOGLE_SIGN_IN: &str = "/api/auth/google";
    pub const PROFILE: &str = "/api/user/profile";
    pub const UPDATE_PROFILE: &str = "/api/user/update-profile";
    pub const REGISTER_COMPLAINT: &str = "/api/user/register-complaint";
    pub const COMPLAINTS: &str = "/api/user/complaints";
    pub const NOTIFICATIONS: &str = "/api/user/notifications";
    pub const VALIDATE_IMAGES: &str = "/api/images/validate/ml/model/validation";
    pub const REVERSE_GEOCODE: &str = "/reverse";

    #[must_use]
    pub fn complaint_detail(id: &ComplaintId) -> String {
        format!("{COMPLAINTS}/{}", id.as_str())
    }

    #[must_use]
    pub fn mark_notification_read(id: &NotificationId) -> String {
        format!("{NOTIFICATIONS}/{}/read", id.as_str())
    }
}

/// Fields every backend body may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiEnvelope {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ApiEnvelope {
    /// Bodies without a `success` flag are treated as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success != Some(false)
    }

    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.message
            .filter(|m| !m.trim().is_empty())
            .or(self.error.filter(|m| !m.trim().is_empty()))
    }
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, "Unexpected response body")
            .with_internal(e.to_string())
    })
}

/// Decodes a body, then fails with the backend's own message when it
/// reports `success: false` under a 2xx status.
pub fn decode_checked<T: DeserializeOwned>(body: &[u8], fallback: &str) -> Result<T, AppError> {
    let envelope: ApiEnvelope = decode(body)?;
    if !envelope.is_success() {
        let message = envelope.into_message().unwrap_or_else(|| fallback.to_string());
        return Err(AppError::new(ErrorKind::Server, message));
    }
    decode(body)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleSignInRequest {
    pub credential: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserSummary {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub token: Option<String>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    #[serde(alias = "user")]
    pub user_data: Option<UserProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComplaintListResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub complaints: Vec<Complaint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComplaintDetailResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub complaint: Option<ComplaintDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitComplaintResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
    #[serde(alias = "id", alias = "_id")]
    pub complaint_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageValidationResponse {
    pub all_valid: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationListResponse {
    pub success: Option<bool>,
    pub notifications: Vec<Notification>,
}

/// The `data` part of a complaint submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintFormData {
    pub ward: String,
    pub landmark: String,
    pub address: String,
    pub category: String,
    pub description: String,
    pub notes: String,
}

/// One entry of the `meta` part, in capture order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMeta {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accuracy: Option<u32>,
    pub timestamp: String,
    pub iso_time: String,
}
