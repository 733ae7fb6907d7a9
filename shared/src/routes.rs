use serde::{Deserialize, Serialize};

use crate::ComplaintId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", content = "id", rename_all = "snake_case")]
pub enum Route {
    #[default]
    Home,
    Auth,
    Dashboard,
    MyComplaints,
    ComplaintDetail(ComplaintId),
    RegisterComplaint,
    Profile,
    Notifications,
    NotFound,
}

impl Route {
    /// Unknown paths resolve to `NotFound`; query strings and fragments
    /// are ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Home,
            ["auth"] => Self::Auth,
            ["dashboard"] => Self::Dashboard,
            ["my-complaints"] => Self::MyComplaints,
            ["complaints", id] => Self::ComplaintDetail(ComplaintId::new(*id)),
            ["register-complaints"] => Self::RegisterComplaint,
            ["profile"] => Self::Profile,
            ["notifications"] => Self::Notifications,
            _ => Self::NotFound,
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".into(),
            Self::Auth => "/auth".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::MyComplaints => "/my-complaints".into(),
            Self::ComplaintDetail(id) => format!("/complaints/{id}"),
            Self::RegisterComplaint => "/register-complaints".into(),
            Self::Profile => "/profile".into(),
            Self::Notifications => "/notifications".into(),
            Self::NotFound => "/404".into(),
        }
    }

    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::Dashboard
                | Self::MyComplaints
                | Self::ComplaintDetail(_)
                | Self::RegisterComplaint
                | Self::Profile
                | Self::Notifications
        )
    }

    /// Navbar links shown to a signed-in user.
    pub const SIGNED_IN_LINKS: [Route; 4] = [
        Route::Home,
        Route::Dashboard,
        Route::MyComplaints,
        Route::RegisterComplaint,
    ];

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Auth => "Sign In",
            Self::Dashboard => "Dashboard",
            Self::MyComplaints => "My Complaints",
            Self::ComplaintDetail(_) => "Complaint",
            Self::RegisterComplaint => "Register Complaint",
            Self::Profile => "Profile",
            Self::Notifications => "Notifications",
            Self::NotFound => "Not Found",
        }
    }
}
