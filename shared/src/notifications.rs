use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{format_time_ago, ComplaintId, NotificationId};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Status,
    Assignment,
    Action,
    Resolved,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub complaint_id: Option<ComplaintId>,
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    #[must_use]
    pub fn time_ago(&self, now_ms: u64) -> String {
        self.created_at
            .and_then(|at| u64::try_from(at.timestamp_millis()).ok())
            .map(|ms| format_time_ago(ms, now_ms))
            .unwrap_or_default()
    }
}

#[must_use]
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

/// Flags the notification as read and returns the complaint it points at.
/// `None` when the id is unknown or carries no complaint.
pub fn mark_read(notifications: &mut [Notification], id: &NotificationId) -> Option<ComplaintId> {
    let notification = notifications.iter_mut().find(|n| &n.id == id)?;
    notification.read = true;
    notification.complaint_id.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Notification> {
        serde_json::from_str(
            r#"[
                {"id":"n1","type":"status","title":"Complaint In Progress","message":"Your complaint #CIV-1033 is now being worked on.","complaintId":"1033","read":false},
                {"id":"n2","type":"assignment","title":"Complaint Assigned","message":"Assigned to Sanitation Department.","complaintId":"1033","read":true},
                {"_id":"n3","type":"action","title":"Action Required","message":"Please upload additional photos.","read":false}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_decode_and_unread_count() {
        let notifications = sample();
        assert_eq!(notifications[2].id.as_str(), "n3");
        assert_eq!(notifications[1].kind, NotificationKind::Assignment);
        assert_eq!(unread_count(&notifications), 2);
    }

    #[test]
    fn test_mark_read_returns_target() {
        let mut notifications = sample();
        let target = mark_read(&mut notifications, &NotificationId::new("n1"));
        assert_eq!(target, Some(ComplaintId::new("1033")));
        assert!(notifications[0].read);
        assert_eq!(unread_count(&notifications), 1);
    }

    #[test]
    fn test_mark_read_without_complaint() {
        let mut notifications = sample();
        assert_eq!(mark_read(&mut notifications, &NotificationId::new("n3")), None);
        assert!(notifications[2].read);
        assert_eq!(mark_read(&mut notifications, &NotificationId::new("missing")), None);
    }
}
