use crate::auth::{AuthScreen, Session};
use crate::capture::CameraSession;
use crate::complaints::{Complaint, ComplaintFilter, DetailCache};
use crate::notifications::{self, Notification};
use crate::profile::{ProfileEditor, UserProfile};
use crate::wizard::ComplaintWizard;
use crate::{AppConfig, PermissionState, Route, ToastKind, ToastMessage};

/// Requests in flight, one flag per page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loading {
    pub profile: bool,
    pub complaints: bool,
    pub detail: bool,
    pub notifications: bool,
}

impl Loading {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.profile || self.complaints || self.detail || self.notifications
    }
}

/// Core state. Secrets stay in `session` and never reach the view.
#[derive(Debug, Default)]
pub struct Model {
    pub config: AppConfig,

    // Session
    pub session: Option<Session>,
    pub session_checked: bool,
    pub redirect_after_login: Option<Route>,
    pub auth_notice: Option<String>,
    pub auth: AuthScreen,

    pub route: Route,

    // Profile
    pub profile: Option<UserProfile>,
    pub profile_editor: ProfileEditor,

    // Complaints
    pub complaints: Vec<Complaint>,
    pub complaint_filter: ComplaintFilter,
    pub details: DetailCache,

    pub notifications: Vec<Notification>,

    // Complaint registration
    pub wizard: ComplaintWizard,
    pub camera: Option<CameraSession>,
    pub camera_permission: PermissionState,
    pub location_permission: PermissionState,

    // Generic UI state
    pub loading: Loading,
    pub alert: Option<String>,
    pub toast: Option<ToastMessage>,
}

impl Model {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(ToastMessage::new(message, kind));
    }

    pub fn expire_toast(&mut self, now_ms: u64) {
        if self.toast.as_ref().is_some_and(|t| t.is_expired(now_ms)) {
            self.toast = None;
        }
    }

    #[must_use]
    pub fn unread_notifications(&self) -> usize {
        notifications::unread_count(&self.notifications)
    }

    /// Drops everything tied to the signed-in user. The caller is
    /// responsible for the stored token and any open camera session.
    pub fn clear_session(&mut self) {
        self.session = None;
        self.profile = None;
        self.profile_editor.finish();
        self.complaints.clear();
        self.complaint_filter = ComplaintFilter::default();
        self.details.clear();
        self.notifications.clear();
        self.wizard.reset();
        self.loading = Loading::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserSummary;
    use crate::ComplaintId;
    use secrecy::SecretString;

    #[test]
    fn test_clear_session_drops_user_data() {
        let mut model = Model {
            session: Some(Session {
                token: SecretString::new("t".into()),
                user: Some(UserSummary::default()),
            }),
            profile: Some(UserProfile::default()),
            complaints: vec![Complaint {
                id: ComplaintId::new("1"),
                ..Complaint::default()
            }],
            ..Model::default()
        };
        model.wizard.draft.ward = "Ward 12".into();
        model.loading.complaints = true;

        model.clear_session();
        assert!(!model.is_authenticated());
        assert!(model.profile.is_none());
        assert!(model.complaints.is_empty());
        assert_eq!(model.wizard.draft.ward, "");
        assert!(!model.loading.any());
    }

    #[test]
    fn test_toast_expiry() {
        let mut model = Model::default();
        model.show_toast("Saved", ToastKind::Success);
        let created = model.toast.as_ref().unwrap().created_at_ms;
        model.expire_toast(created + 1_000);
        assert!(model.toast.is_some());
        model.expire_toast(created + 2_001);
        assert!(model.toast.is_none());
    }

    #[test]
    fn test_session_debug_hides_token() {
        let model = Model {
            session: Some(Session {
                token: SecretString::new("very-secret-token".into()),
                user: None,
            }),
            ..Model::default()
        };
        assert!(!format!("{model:?}").contains("very-secret-token"));
    }
}
