//! What the shell renders. Everything here is plain data, already
//! formatted; the shell never sees the session token or raw captures.

use serde::{Deserialize, Serialize};

use crate::auth::{AuthMode, ResetStage};
use crate::capture::{Capture, CameraStatus};
use crate::complaints::{self, Complaint, ComplaintDetail, ComplaintStatus, DashboardStats};
use crate::image_processing::data_url;
use crate::model::Model;
use crate::notifications::{Notification, NotificationKind};
use crate::profile::UserProfile;
use crate::wizard::{
    ComplaintCategory, DraftField, ImageCheck, LocationLookup, Submission, WizardStep,
};
use crate::{
    truncate_preview, CaptureId, ComplaintId, NotificationId, PermissionState, Route,
    ToastMessage,
    DESCRIPTION_PREVIEW_LENGTH, MAX_CAPTURES, TOTAL_WIZARD_STEPS,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub route_path: String,
    pub title: String,
    pub navbar: NavbarView,
    pub screen: Screen,
    pub toast: Option<ToastMessage>,
    pub alert: Option<String>,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub path: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavbarView {
    pub signed_in: bool,
    pub user_name: Option<String>,
    pub avatar_url: Option<String>,
    pub unread_notifications: usize,
    pub links: Vec<NavLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "screen", content = "data", rename_all = "snake_case")]
pub enum Screen {
    Home { signed_in: bool },
    Auth(AuthView),
    Dashboard(DashboardView),
    MyComplaints(ComplaintListView),
    ComplaintDetail(DetailView),
    RegisterComplaint(Box<WizardView>),
    Profile(ProfileView),
    Notifications(NotificationsView),
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthView {
    pub mode: AuthMode,
    pub notice: Option<String>,
    pub name: String,
    pub email: String,
    pub reset: Option<ResetView>,
    pub submitting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetView {
    pub stage: ResetStage,
    pub email: String,
    pub heading: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintCard {
    pub id: ComplaintId,
    pub label: String,
    pub title: String,
    pub category: String,
    pub status: String,
    pub status_tone: StatusTone,
    pub location: String,
    pub date: String,
    pub time_ago: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Pending,
    Active,
    Done,
    Rejected,
    Neutral,
}

impl From<&ComplaintStatus> for StatusTone {
    fn from(status: &ComplaintStatus) -> Self {
        match status {
            ComplaintStatus::Pending => Self::Pending,
            ComplaintStatus::InProgress => Self::Active,
            ComplaintStatus::Resolved | ComplaintStatus::Success => Self::Done,
            ComplaintStatus::Rejected => Self::Rejected,
            ComplaintStatus::Other(_) => Self::Neutral,
        }
    }
}

impl ComplaintCard {
    fn from_complaint(complaint: &Complaint, now_ms: u64) -> Self {
        Self {
            id: complaint.id.clone(),
            label: complaint.id.display_label(),
            title: complaint.display_title().to_string(),
            category: complaint.category.clone(),
            status: complaint.status.label().to_string(),
            status_tone: StatusTone::from(&complaint.status),
            location: complaint.location.clone(),
            date: complaint.date_label(),
            time_ago: complaint.time_ago(now_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardView {
    pub greeting: String,
    pub stats: DashboardStats,
    pub recent: Vec<ComplaintCard>,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintListView {
    pub search: String,
    pub category: Option<String>,
    pub status: Option<String>,
    pub category_options: Vec<String>,
    pub status_options: Vec<String>,
    pub complaints: Vec<ComplaintCard>,
    pub total: usize,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceView {
    pub image_url: String,
    pub location: Option<String>,
    pub accuracy: Option<String>,
    pub captured_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailView {
    pub loading: bool,
    pub complaint: Option<ComplaintDetailView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintDetailView {
    pub card: ComplaintCard,
    pub ward: String,
    pub landmark: String,
    pub address: String,
    pub description: String,
    pub notes: String,
    pub evidence: Vec<EvidenceView>,
}

impl ComplaintDetailView {
    fn from_detail(detail: &ComplaintDetail, now_ms: u64) -> Self {
        let evidence = detail
            .evidence
            .iter()
            .map(|item| EvidenceView {
                image_url: item.image_url.clone(),
                location: item
                    .lat
                    .zip(item.lng)
                    .map(|(lat, lng)| format!("{lat:.5}, {lng:.5}")),
                accuracy: item.accuracy.map(|a| format!("±{a:.0}m")),
                captured_at: item.captured_at.clone(),
            })
            .collect();

        Self {
            card: ComplaintCard::from_complaint(&detail.summary(), now_ms),
            ward: detail.ward.clone(),
            landmark: detail.landmark.clone(),
            address: detail.address.clone(),
            description: detail.description.clone(),
            notes: detail.notes.clone(),
            evidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldView {
    pub field: DraftField,
    pub value: String,
    pub invalid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureCard {
    pub id: CaptureId,
    pub preview_url: String,
    pub time: String,
    pub location: String,
    pub accuracy: Option<String>,
    pub size: String,
}

impl CaptureCard {
    fn from_capture(capture: &Capture) -> Self {
        Self {
            id: capture.id,
            preview_url: data_url("image/jpeg", &capture.preview_jpeg),
            time: capture.display_time(),
            location: capture.location_label(),
            accuracy: capture.reading.map(|r| format!("±{}m", r.accuracy_m)),
            size: capture.size_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraView {
    pub counter: String,
    pub gps_label: String,
    pub status_text: String,
    pub locked: bool,
    pub can_shoot: bool,
    pub capturing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WizardView {
    pub step: WizardStep,
    pub step_number: u8,
    pub total_steps: u8,
    pub step_title: String,
    pub progress_percent: u8,
    pub captures: Vec<CaptureCard>,
    pub can_add_capture: bool,
    pub camera: Option<CameraView>,
    pub camera_permission: PermissionState,
    pub location_permission: PermissionState,
    pub image_check: ImageCheck,
    pub proposed_location: Option<String>,
    pub lookup: LocationLookup,
    pub fields: Vec<FieldView>,
    pub categories: Vec<String>,
    pub can_go_back: bool,
    pub is_submitting: bool,
    pub success: Option<SuccessView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessView {
    pub message: String,
    pub complaint_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileView {
    pub loading: bool,
    pub editing: bool,
    pub saving: bool,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub gender: String,
    pub dob: String,
    pub dob_input: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationItem {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub time_ago: String,
    pub read: bool,
    pub complaint_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationsView {
    pub loading: bool,
    pub unread: usize,
    pub items: Vec<NotificationItem>,
}

fn navbar(model: &Model) -> NavbarView {
    if !model.is_authenticated() {
        return NavbarView::default();
    }

    let user_name = model
        .profile
        .as_ref()
        .map(|p| p.name.clone())
        .or_else(|| {
            model
                .session
                .as_ref()
                .and_then(|s| s.user.as_ref())
                .map(|u| u.name.clone())
        })
        .filter(|n| !n.trim().is_empty());

    let links = Route::SIGNED_IN_LINKS
        .iter()
        .map(|route| NavLink {
            label: route.title().to_string(),
            path: route.path(),
            active: *route == model.route,
        })
        .collect();

    NavbarView {
        signed_in: true,
        user_name,
        avatar_url: model
            .profile
            .as_ref()
            .map(|p| p.image.clone())
            .filter(|url| !url.is_empty()),
        unread_notifications: model.unread_notifications(),
        links,
    }
}

fn auth_view(model: &Model) -> AuthView {
    let auth = &model.auth;
    let (name, email) = match auth.mode {
        AuthMode::Login => (String::new(), auth.login.email.clone()),
        AuthMode::Register => (auth.register.name.clone(), auth.register.email.clone()),
    };
    AuthView {
        mode: auth.mode,
        notice: model.auth_notice.clone(),
        name,
        email,
        reset: auth.reset.as_ref().map(|r| ResetView {
            stage: r.stage,
            email: r.email.clone(),
            heading: match r.stage {
                ResetStage::RequestOtp => "Forgot Password".into(),
                ResetStage::VerifyOtp => "Verify OTP".into(),
                ResetStage::NewPassword => "Set New Password".into(),
            },
        }),
        submitting: auth.submitting,
    }
}

fn dashboard_view(model: &Model, now_ms: u64) -> DashboardView {
    let first_name = model
        .profile
        .as_ref()
        .and_then(|p| p.name.split_whitespace().next())
        .unwrap_or("Citizen");
    DashboardView {
        greeting: format!("Welcome back, {first_name}"),
        stats: DashboardStats::from_complaints(&model.complaints),
        recent: complaints::recent(&model.complaints)
            .into_iter()
            .map(|c| ComplaintCard::from_complaint(c, now_ms))
            .collect(),
        loading: model.loading.complaints,
    }
}

fn list_view(model: &Model, now_ms: u64) -> ComplaintListView {
    let filter = &model.complaint_filter;
    ComplaintListView {
        search: filter.search.clone(),
        category: filter.category.clone(),
        status: filter.status.as_ref().map(|s| s.label().to_string()),
        category_options: complaints::category_options(&model.complaints),
        status_options: ComplaintStatus::KNOWN
            .iter()
            .map(|s| s.label().to_string())
            .collect(),
        complaints: filter
            .apply(&model.complaints)
            .map(|c| ComplaintCard::from_complaint(c, now_ms))
            .collect(),
        total: model.complaints.len(),
        loading: model.loading.complaints,
    }
}

fn detail_view(model: &Model, id: &ComplaintId, now_ms: u64) -> DetailView {
    DetailView {
        loading: model.loading.detail,
        complaint: model
            .details
            .peek(id)
            .map(|d| ComplaintDetailView::from_detail(d, now_ms)),
    }
}

fn wizard_view(model: &Model) -> WizardView {
    let wizard = &model.wizard;
    let draft = &wizard.draft;

    let fields = [
        (DraftField::Ward, draft.ward.clone()),
        (DraftField::Landmark, draft.landmark.clone()),
        (DraftField::Address, draft.address.clone()),
        (
            DraftField::Category,
            draft
                .category
                .map(ComplaintCategory::label)
                .unwrap_or_default()
                .to_string(),
        ),
        (DraftField::Description, draft.description.clone()),
        (DraftField::Notes, draft.notes.clone()),
    ]
    .into_iter()
    .map(|(field, value)| FieldView {
        field,
        value,
        invalid: wizard.errors.contains(field),
    })
    .chain(std::iter::once(FieldView {
        field: DraftField::Evidence,
        value: draft.captures.len().to_string(),
        invalid: wizard.errors.contains(DraftField::Evidence),
    }))
    .collect();

    let camera = model.camera.as_ref().map(|session| CameraView {
        counter: format!(
            "Photo {}/{}",
            (draft.captures.len() + 1).min(MAX_CAPTURES),
            MAX_CAPTURES
        ),
        gps_label: session.signal().label(),
        status_text: session.status_text().to_string(),
        locked: session.is_locked(),
        can_shoot: session.can_shoot(),
        capturing: session.status == CameraStatus::Capturing,
    });

    let success = match &wizard.submission {
        Submission::Succeeded {
            complaint_id,
            message,
        } => Some(SuccessView {
            message: message.clone(),
            complaint_label: complaint_id.as_ref().map(ComplaintId::display_label),
        }),
        _ => None,
    };

    WizardView {
        step: wizard.step,
        step_number: wizard.step.number(),
        total_steps: TOTAL_WIZARD_STEPS,
        step_title: wizard.step.title().to_string(),
        progress_percent: wizard.step.progress_percent(),
        captures: draft.captures.iter().map(CaptureCard::from_capture).collect(),
        can_add_capture: wizard.can_add_capture(),
        camera,
        camera_permission: model.camera_permission,
        location_permission: model.location_permission,
        image_check: wizard.image_check.clone(),
        proposed_location: draft.location_hint().map(|c| c.display()),
        lookup: wizard.lookup.clone(),
        fields,
        categories: ComplaintCategory::ALL
            .iter()
            .map(|c| c.label().to_string())
            .collect(),
        can_go_back: wizard.step != WizardStep::Evidence && !wizard.is_submitting(),
        is_submitting: wizard.is_submitting(),
        success,
    }
}

fn profile_view(model: &Model) -> ProfileView {
    let editor = &model.profile_editor;
    let editing = editor.is_editing();
    let fallback = UserProfile::default();
    let shown = if editing {
        &editor.draft
    } else {
        model.profile.as_ref().unwrap_or(&fallback)
    };
    let avatar_url = if editing {
        editor.avatar_url()
    } else {
        Some(shown.image.clone()).filter(|s| !s.is_empty())
    };

    ProfileView {
        loading: model.loading.profile,
        editing,
        saving: editor.saving,
        name: shown.name.clone(),
        email: shown.email.clone(),
        phone: shown.phone.clone(),
        address: shown.address.clone(),
        gender: shown.gender.label().to_string(),
        dob: shown.dob_label(),
        dob_input: shown
            .dob
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        avatar_url,
    }
}

fn notifications_view(model: &Model, now_ms: u64) -> NotificationsView {
    NotificationsView {
        loading: model.loading.notifications,
        unread: model.unread_notifications(),
        items: model
            .notifications
            .iter()
            .map(|n: &Notification| NotificationItem {
                id: n.id.clone(),
                kind: n.kind,
                title: n.title.clone(),
                message: truncate_preview(&n.message, DESCRIPTION_PREVIEW_LENGTH),
                time_ago: n.time_ago(now_ms),
                read: n.read,
                complaint_label: n.complaint_id.as_ref().map(ComplaintId::display_label),
            })
            .collect(),
    }
}

/// Projects the model for the shell at a given wall-clock time.
#[must_use]
pub fn build(model: &Model, now_ms: u64) -> ViewModel {
    let screen = match &model.route {
        Route::Home => Screen::Home {
            signed_in: model.is_authenticated(),
        },
        Route::Auth => Screen::Auth(auth_view(model)),
        Route::Dashboard => Screen::Dashboard(dashboard_view(model, now_ms)),
        Route::MyComplaints => Screen::MyComplaints(list_view(model, now_ms)),
        Route::ComplaintDetail(id) => Screen::ComplaintDetail(detail_view(model, id, now_ms)),
        Route::RegisterComplaint => Screen::RegisterComplaint(Box::new(wizard_view(model))),
        Route::Profile => Screen::Profile(profile_view(model)),
        Route::Notifications => Screen::Notifications(notifications_view(model, now_ms)),
        Route::NotFound => Screen::NotFound,
    };

    ViewModel {
        route_path: model.route.path(),
        title: model.route.title().to_string(),
        navbar: navbar(model),
        screen,
        toast: model.toast.clone(),
        alert: model.alert.clone(),
        is_loading: model.loading.any()
            || model.auth.submitting
            || model.profile_editor.saving
            || model.wizard.is_submitting(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserSummary;
    use crate::auth::Session;
    use crate::capture::test_support::{capture, reading};
    use crate::capture::CameraSession;
    use crate::notifications::Notification;
    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;

    const NOW: u64 = 1_736_700_000_000;

    fn signed_in() -> Model {
        Model {
            session: Some(Session {
                token: SecretString::new("tok".into()),
                user: Some(UserSummary {
                    id: Some("u1".into()),
                    name: "Asha Rao".into(),
                    email: "asha@example.com".into(),
                }),
            }),
            ..Model::default()
        }
    }

    fn complaint(id: &str, status: ComplaintStatus, day: u32) -> Complaint {
        Complaint {
            id: ComplaintId::new(id),
            title: format!("Issue {id}"),
            category: "Roads".into(),
            status,
            location: "MG Road".into(),
            created_at: Some(Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_signed_out_navbar_is_empty() {
        let view = build(&Model::default(), NOW);
        assert!(!view.navbar.signed_in);
        assert!(view.navbar.links.is_empty());
        assert_eq!(view.screen, Screen::Home { signed_in: false });
    }

    #[test]
    fn test_navbar_uses_session_user_until_profile_loads() {
        let mut model = signed_in();
        model.route = Route::Dashboard;
        let view = build(&model, NOW);
        assert_eq!(view.navbar.user_name.as_deref(), Some("Asha Rao"));
        let active: Vec<_> = view.navbar.links.iter().filter(|l| l.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].path, "/dashboard");
    }

    #[test]
    fn test_unread_badge() {
        let mut model = signed_in();
        model.notifications = vec![
            Notification {
                id: NotificationId::new("n1"),
                ..Notification::default()
            },
            Notification {
                id: NotificationId::new("n2"),
                read: true,
                ..Notification::default()
            },
        ];
        assert_eq!(build(&model, NOW).navbar.unread_notifications, 1);
    }

    #[test]
    fn test_dashboard_stats_and_recent() {
        let mut model = signed_in();
        model.route = Route::Dashboard;
        model.complaints = vec![
            complaint("1", ComplaintStatus::Pending, 1),
            complaint("2", ComplaintStatus::InProgress, 5),
            complaint("3", ComplaintStatus::Success, 3),
            complaint("4", ComplaintStatus::Resolved, 9),
        ];

        let Screen::Dashboard(dashboard) = build(&model, NOW).screen else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.stats.total, 4);
        assert_eq!(dashboard.stats.resolved, 2);
        let labels: Vec<_> = dashboard.recent.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["#CIV-4", "#CIV-2", "#CIV-3"]);
    }

    #[test]
    fn test_list_applies_filter() {
        let mut model = signed_in();
        model.route = Route::MyComplaints;
        model.complaints = vec![
            complaint("1033", ComplaintStatus::Pending, 1),
            complaint("2044", ComplaintStatus::Resolved, 2),
        ];
        model.complaint_filter.search = "1033".into();

        let Screen::MyComplaints(list) = build(&model, NOW).screen else {
            panic!("expected list");
        };
        assert_eq!(list.total, 2);
        assert_eq!(list.complaints.len(), 1);
        assert_eq!(list.complaints[0].label, "#CIV-1033");
        assert_eq!(list.complaints[0].status_tone, StatusTone::Pending);
    }

    #[test]
    fn test_wizard_camera_overlay() {
        let mut model = signed_in();
        model.route = Route::RegisterComplaint;
        model
            .wizard
            .add_capture(capture(Some(reading(12.9716, 77.5946, 8.0))))
            .unwrap();
        let mut session = CameraSession::opening();
        session.record(reading(12.9716, 77.5946, 35.0));
        model.camera = Some(session);

        let Screen::RegisterComplaint(wizard) = build(&model, NOW).screen else {
            panic!("expected wizard");
        };
        let camera = wizard.camera.unwrap();
        assert_eq!(camera.counter, "Photo 2/3");
        assert_eq!(camera.gps_label, "Fair (35m)");
        assert_eq!(camera.status_text, "Calibrating GPS...");
        assert!(!camera.locked);
        assert!(!camera.can_shoot);

        assert_eq!(wizard.captures.len(), 1);
        assert!(wizard.captures[0].preview_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(wizard.proposed_location.as_deref(), Some("12.97160, 77.59460"));
        assert_eq!(wizard.step_number, 1);
        assert_eq!(wizard.progress_percent, 0);
    }

    #[test]
    fn test_wizard_marks_invalid_fields() {
        let mut model = signed_in();
        model.route = Route::RegisterComplaint;
        model.wizard.errors.mark(DraftField::Ward);

        let Screen::RegisterComplaint(wizard) = build(&model, NOW).screen else {
            panic!("expected wizard");
        };
        let invalid: Vec<_> = wizard
            .fields
            .iter()
            .filter(|f| f.invalid)
            .map(|f| f.field)
            .collect();
        assert_eq!(invalid, [DraftField::Ward]);
        assert_eq!(wizard.categories, ["Sanitation", "Roads", "Electric"]);
    }

    #[test]
    fn test_auth_notice_is_shown() {
        let model = Model {
            route: Route::Auth,
            auth_notice: Some(crate::LOGIN_REQUIRED_MESSAGE.into()),
            ..Model::default()
        };
        let Screen::Auth(auth) = build(&model, NOW).screen else {
            panic!("expected auth");
        };
        assert_eq!(auth.notice.as_deref(), Some("Please login to continue"));
        assert_eq!(auth.mode, AuthMode::Login);
    }

    #[test]
    fn test_view_never_carries_token() {
        let mut model = signed_in();
        model.route = Route::Profile;
        let json = serde_json::to_string(&build(&model, NOW)).unwrap();
        assert!(!json.contains("tok\""));
        assert!(json.contains("\"screen\":\"profile\""));
    }
}
