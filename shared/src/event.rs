use serde::{Deserialize, Serialize};

use crate::auth::{AuthField, AuthMode};
use crate::capabilities::{CameraResult, GeolocationResult, HttpResult, KvResult};
use crate::complaints::ComplaintStatus;
use crate::profile::ProfileField;
use crate::wizard::DraftField;
use crate::{AppConfig, CaptureId, ComplaintId, NotificationId, Route};

/// Everything the core reacts to. Variants below "capability responses"
/// are raised by the core itself and never cross the FFI boundary; large
/// payloads are boxed to keep the enum small.
#[derive(Serialize, Deserialize, Debug)]
pub enum Event {
    // Lifecycle
    AppStarted {
        config: AppConfig,
    },
    Tick {
        now_ms: u64,
    },
    Navigate(Route),
    NavigateToPath(String),
    DismissToast,
    DismissAlert,

    // Auth
    AuthModeChanged(AuthMode),
    AuthFieldChanged {
        field: AuthField,
        value: String,
    },
    LoginSubmitted,
    RegisterSubmitted,
    GoogleCredentialReceived(String),
    ForgotPasswordStarted,
    PasswordResetSubmitted,
    PasswordResetCancelled,
    Logout,

    // Profile
    EditProfile,
    ProfileFieldChanged {
        field: ProfileField,
        value: String,
    },
    AvatarSelected(#[serde(with = "serde_bytes")] Vec<u8>),
    AvatarRemoved,
    SaveProfile,
    CancelProfileEdit,

    // Complaints & notifications
    RefreshComplaints,
    SearchChanged(String),
    CategoryFilterChanged(Option<String>),
    StatusFilterChanged(Option<ComplaintStatus>),
    RefreshNotifications,
    NotificationOpened(NotificationId),

    // Complaint registration
    OpenCamera,
    ShutterPressed,
    CloseCamera,
    RemoveCapture(CaptureId),
    DraftFieldChanged {
        field: DraftField,
        value: String,
    },
    NextStep,
    PreviousStep,
    DetectLocation,
    ConfirmationDismissed,

    // Capability responses
    #[serde(skip)]
    SessionLoaded(Box<KvResult>),
    #[serde(skip)]
    SessionStored(Box<KvResult>),
    #[serde(skip)]
    SessionDeleted(Box<KvResult>),

    #[serde(skip)]
    LoginResponse(Box<HttpResult>),
    #[serde(skip)]
    RegisterResponse(Box<HttpResult>),
    #[serde(skip)]
    GoogleSignInResponse(Box<HttpResult>),
    #[serde(skip)]
    PasswordResetResponse(Box<HttpResult>),

    #[serde(skip)]
    ProfileFetched(Box<HttpResult>),
    #[serde(skip)]
    ProfileSaved(Box<HttpResult>),

    #[serde(skip)]
    ComplaintsFetched(Box<HttpResult>),
    #[serde(skip)]
    ComplaintDetailFetched {
        id: ComplaintId,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    NotificationsFetched(Box<HttpResult>),
    #[serde(skip)]
    NotificationMarked(Box<HttpResult>),

    #[serde(skip)]
    ImagesValidated(Box<HttpResult>),
    #[serde(skip)]
    ComplaintSubmitted {
        key: String,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    AddressResolved(Box<HttpResult>),

    CameraOpened(Box<CameraResult>),
    PhotoCaptured(Box<CameraResult>),
    PositionUpdated(Box<GeolocationResult>),
    CurrentPositionReceived(Box<GeolocationResult>),
}

impl Event {
    /// Stable name for logs; never includes payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted { .. } => "app_started",
            Self::Tick { .. } => "tick",
            Self::Navigate(_) => "navigate",
            Self::NavigateToPath(_) => "navigate_to_path",
            Self::DismissToast => "dismiss_toast",
            Self::DismissAlert => "dismiss_alert",
            Self::AuthModeChanged(_) => "auth_mode_changed",
            Self::AuthFieldChanged { .. } => "auth_field_changed",
            Self::LoginSubmitted => "login_submitted",
            Self::RegisterSubmitted => "register_submitted",
            Self::GoogleCredentialReceived(_) => "google_credential_received",
            Self::ForgotPasswordStarted => "forgot_password_started",
            Self::PasswordResetSubmitted => "password_reset_submitted",
            Self::PasswordResetCancelled => "password_reset_cancelled",
            Self::Logout => "logout",
            Self::EditProfile => "edit_profile",
            Self::ProfileFieldChanged { .. } => "profile_field_changed",
            Self::AvatarSelected(_) => "avatar_selected",
            Self::AvatarRemoved => "avatar_removed",
            Self::SaveProfile => "save_profile",
            Self::CancelProfileEdit => "cancel_profile_edit",
            Self::RefreshComplaints => "refresh_complaints",
            Self::SearchChanged(_) => "search_changed",
            Self::CategoryFilterChanged(_) => "category_filter_changed",
            Self::StatusFilterChanged(_) => "status_filter_changed",
            Self::RefreshNotifications => "refresh_notifications",
            Self::NotificationOpened(_) => "notification_opened",
            Self::OpenCamera => "open_camera",
            Self::ShutterPressed => "shutter_pressed",
            Self::CloseCamera => "close_camera",
            Self::RemoveCapture(_) => "remove_capture",
            Self::DraftFieldChanged { .. } => "draft_field_changed",
            Self::NextStep => "next_step",
            Self::PreviousStep => "previous_step",
            Self::DetectLocation => "detect_location",
            Self::ConfirmationDismissed => "confirmation_dismissed",
            Self::SessionLoaded(_) => "session_loaded",
            Self::SessionStored(_) => "session_stored",
            Self::SessionDeleted(_) => "session_deleted",
            Self::LoginResponse(_) => "login_response",
            Self::RegisterResponse(_) => "register_response",
            Self::GoogleSignInResponse(_) => "google_sign_in_response",
            Self::PasswordResetResponse(_) => "password_reset_response",
            Self::ProfileFetched(_) => "profile_fetched",
            Self::ProfileSaved(_) => "profile_saved",
            Self::ComplaintsFetched(_) => "complaints_fetched",
            Self::ComplaintDetailFetched { .. } => "complaint_detail_fetched",
            Self::NotificationsFetched(_) => "notifications_fetched",
            Self::NotificationMarked(_) => "notification_marked",
            Self::ImagesValidated(_) => "images_validated",
            Self::ComplaintSubmitted { .. } => "complaint_submitted",
            Self::AddressResolved(_) => "address_resolved",
            Self::CameraOpened(_) => "camera_opened",
            Self::PhotoCaptured(_) => "photo_captured",
            Self::PositionUpdated(_) => "position_updated",
            Self::CurrentPositionReceived(_) => "current_position_received",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CameraError, Position};

    #[test]
    fn test_user_events_cross_ffi() {
        let json = serde_json::to_string(&Event::DraftFieldChanged {
            field: DraftField::Ward,
            value: "Ward 12".into(),
        })
        .unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "draft_field_changed");

        let nav: Event = serde_json::from_str(r#"{"NavigateToPath":"/complaints/1033"}"#).unwrap();
        assert!(matches!(nav, Event::NavigateToPath(p) if p == "/complaints/1033"));
    }

    #[test]
    fn test_shell_results_serialize() {
        let position = Event::PositionUpdated(Box::new(Ok(Position {
            lat: 12.9716,
            lng: 77.5946,
            accuracy_m: 8.0,
        })));
        assert!(serde_json::to_string(&position).is_ok());

        let denied = Event::CameraOpened(Box::new(Err(CameraError::PermissionDenied)));
        assert!(serde_json::to_string(&denied).is_ok());
    }

    #[test]
    fn test_event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(
            size <= 128,
            "Event enum is {size} bytes, box more variants"
        );
    }
}
