//! Server-owned complaint records, list filtering and the dashboard
//! summary. Status transitions happen on the backend only.

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::{format_time_ago, ComplaintId, COMPLAINT_DETAIL_CACHE_SIZE, RECENT_COMPLAINTS_COUNT};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Success,
    Rejected,
    /// A label this client does not know yet, shown as sent.
    Other(String),
}

impl ComplaintStatus {
    pub const KNOWN: [ComplaintStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Resolved,
        Self::Success,
        Self::Rejected,
    ];

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Success => "Success",
            Self::Rejected => "Rejected",
            Self::Other(label) => label,
        }
    }

    /// Counted under the dashboard's "Resolved" card.
    #[must_use]
    pub const fn is_closed_ok(&self) -> bool {
        matches!(self, Self::Resolved | Self::Success)
    }
}

impl From<String> for ComplaintStatus {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "pending" => Self::Pending,
            "in progress" | "inprogress" => Self::InProgress,
            "resolved" => Self::Resolved,
            "success" => Self::Success,
            "rejected" => Self::Rejected,
            _ => Self::Other(raw),
        }
    }
}

impl From<ComplaintStatus> for String {
    fn from(status: ComplaintStatus) -> Self {
        match status {
            ComplaintStatus::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Complaint {
    #[serde(alias = "_id")]
    pub id: ComplaintId,
    pub title: String,
    pub category: String,
    pub status: ComplaintStatus,
    #[serde(alias = "address")]
    pub location: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Complaint {
    /// Older records have no title; the category stands in.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if !self.title.trim().is_empty() {
            &self.title
        } else if !self.category.trim().is_empty() {
            &self.category
        } else {
            "Complaint"
        }
    }

    /// `12 Jan 2025`
    #[must_use]
    pub fn date_label(&self) -> String {
        self.created_at
            .map(|at| at.format("%d %b %Y").to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn time_ago(&self, now_ms: u64) -> String {
        self.created_at
            .and_then(|at| u64::try_from(at.timestamp_millis()).ok())
            .map(|ms| format_time_ago(ms, now_ms))
            .unwrap_or_default()
    }
}

/// Search and select filters on the "My Complaints" page. `None` means
/// "All".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintFilter {
    pub search: String,
    pub category: Option<String>,
    pub status: Option<ComplaintStatus>,
}

impl ComplaintFilter {
    #[must_use]
    pub fn matches(&self, complaint: &Complaint) -> bool {
        let term = self.search.trim().to_lowercase();
        let matches_search = term.is_empty()
            || complaint.display_title().to_lowercase().contains(&term)
            || complaint.id.as_str().to_lowercase().contains(&term)
            || complaint.location.to_lowercase().contains(&term);

        let matches_category = self
            .category
            .as_ref()
            .map_or(true, |c| complaint.category.eq_ignore_ascii_case(c));

        let matches_status = self.status.as_ref().map_or(true, |s| &complaint.status == s);

        matches_search && matches_category && matches_status
    }

    pub fn apply<'a>(&'a self, complaints: &'a [Complaint]) -> impl Iterator<Item = &'a Complaint> {
        complaints.iter().filter(|c| self.matches(c))
    }
}

/// Category options for the filter select, in first-seen order.
#[must_use]
pub fn category_options(complaints: &[Complaint]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for category in complaints.iter().map(|c| c.category.trim()) {
        if !category.is_empty() && !options.iter().any(|o| o.eq_ignore_ascii_case(category)) {
            options.push(category.to_string());
        }
    }
    options
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub pending: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn from_complaints(complaints: &[Complaint]) -> Self {
        complaints.iter().fold(
            Self {
                total: complaints.len(),
                ..Self::default()
            },
            |mut stats, c| {
                match &c.status {
                    ComplaintStatus::InProgress => stats.in_progress += 1,
                    ComplaintStatus::Pending => stats.pending += 1,
                    s if s.is_closed_ok() => stats.resolved += 1,
                    _ => {}
                }
                stats
            },
        )
    }
}

/// Newest first; undated records sort last.
#[must_use]
pub fn recent(complaints: &[Complaint]) -> Vec<&Complaint> {
    let mut sorted: Vec<&Complaint> = complaints.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(RECENT_COMPLAINTS_COUNT);
    sorted
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EvidenceItem {
    #[serde(alias = "url", alias = "imageUrl")]
    pub image_url: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accuracy: Option<f64>,
    #[serde(alias = "isoTime", alias = "timestamp")]
    pub captured_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ComplaintDetail {
    #[serde(alias = "_id")]
    pub id: ComplaintId,
    pub title: String,
    pub category: String,
    pub status: ComplaintStatus,
    #[serde(alias = "location")]
    pub address: String,
    pub ward: String,
    pub landmark: String,
    pub description: String,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(alias = "images")]
    pub evidence: Vec<EvidenceItem>,
}

impl ComplaintDetail {
    #[must_use]
    pub fn summary(&self) -> Complaint {
        Complaint {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            status: self.status.clone(),
            location: self.address.clone(),
            created_at: self.created_at,
        }
    }
}

const DETAIL_CACHE_CAPACITY: NonZeroUsize =
    NonZeroUsize::MIN.saturating_add(COMPLAINT_DETAIL_CACHE_SIZE - 1);

/// Recently opened complaint details, bounded.
#[derive(Debug)]
pub struct DetailCache {
    entries: LruCache<ComplaintId, ComplaintDetail>,
}

impl Default for DetailCache {
    fn default() -> Self {
        Self {
            entries: LruCache::new(DETAIL_CACHE_CAPACITY),
        }
    }
}

impl DetailCache {
    /// Marks the entry as recently used.
    pub fn get(&mut self, id: &ComplaintId) -> Option<&ComplaintDetail> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn peek(&self, id: &ComplaintId) -> Option<&ComplaintDetail> {
        self.entries.peek(id)
    }

    pub fn insert(&mut self, detail: ComplaintDetail) {
        self.entries.put(detail.id.clone(), detail);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn complaint(id: &str, title: &str, category: &str, status: &str, day: u32) -> Complaint {
        Complaint {
            id: ComplaintId::new(id),
            title: title.into(),
            category: category.into(),
            status: status.to_string().into(),
            location: format!("Ward {day}, Main Road"),
            created_at: Some(Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap()),
        }
    }

    fn sample() -> Vec<Complaint> {
        vec![
            complaint("1033", "Garbage Overflow", "Sanitation", "In Progress", 12),
            complaint("1031", "Pothole", "Roads", "Pending", 10),
            complaint("1029", "Streetlight Failure", "Electric", "Resolved", 8),
            complaint("1027", "Drain Blocked", "Sanitation", "Success", 6),
        ]
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(ComplaintStatus::from("In Progress".to_string()), ComplaintStatus::InProgress);
        assert_eq!(ComplaintStatus::from("in_progress".to_string()), ComplaintStatus::InProgress);
        assert_eq!(ComplaintStatus::from("RESOLVED".to_string()), ComplaintStatus::Resolved);
        assert_eq!(
            ComplaintStatus::from("Escalated".to_string()),
            ComplaintStatus::Other("Escalated".into())
        );
    }

    #[test]
    fn test_status_wire_form() {
        let json = serde_json::to_string(&ComplaintStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let other: ComplaintStatus = serde_json::from_str("\"Escalated\"").unwrap();
        assert_eq!(other.label(), "Escalated");
    }

    #[test]
    fn test_complaint_from_backend() {
        let c: Complaint = serde_json::from_str(
            r#"{"_id":"1033","category":"Sanitation","status":"Pending","address":"MG Road","createdAt":"2025-01-12T10:30:45Z"}"#,
        )
        .unwrap();
        assert_eq!(c.id.as_str(), "1033");
        assert_eq!(c.display_title(), "Sanitation");
        assert_eq!(c.location, "MG Road");
        assert_eq!(c.date_label(), "12 Jan 2025");
    }

    #[test]
    fn test_search_filter() {
        let complaints = sample();
        let filter = ComplaintFilter {
            search: "POTHOLE".into(),
            ..ComplaintFilter::default()
        };
        let ids: Vec<_> = filter.apply(&complaints).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1031"]);

        let by_id = ComplaintFilter {
            search: "102".into(),
            ..ComplaintFilter::default()
        };
        assert_eq!(by_id.apply(&complaints).count(), 2);

        let by_location = ComplaintFilter {
            search: "ward 8".into(),
            ..ComplaintFilter::default()
        };
        assert_eq!(by_location.apply(&complaints).count(), 1);
    }

    #[test]
    fn test_category_and_status_filters() {
        let complaints = sample();
        let filter = ComplaintFilter {
            category: Some("Sanitation".into()),
            status: Some(ComplaintStatus::Success),
            ..ComplaintFilter::default()
        };
        let ids: Vec<_> = filter.apply(&complaints).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1027"]);
        assert_eq!(ComplaintFilter::default().apply(&complaints).count(), 4);
    }

    #[test]
    fn test_category_options() {
        assert_eq!(category_options(&sample()), vec!["Sanitation", "Roads", "Electric"]);
    }

    #[test]
    fn test_dashboard_stats() {
        let stats = DashboardStats::from_complaints(&sample());
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                in_progress: 1,
                resolved: 2,
                pending: 1,
            }
        );
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut complaints = sample();
        complaints.reverse();
        let ids: Vec<_> = recent(&complaints).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1033", "1031", "1029"]);
    }

    #[test]
    fn test_time_ago() {
        let c = complaint("1", "t", "Roads", "Pending", 10);
        let now = u64::try_from(
            Utc.with_ymd_and_hms(2025, 1, 12, 9, 0, 0)
                .unwrap()
                .timestamp_millis(),
        )
        .unwrap();
        assert_eq!(c.time_ago(now), "2d ago");
    }

    #[test]
    fn test_detail_with_evidence() {
        let detail: ComplaintDetail = serde_json::from_str(
            r#"{"_id":"1033","title":"Garbage","status":"In Progress","ward":"Ward 12",
                "images":[{"url":"https://cdn/x.jpg","lat":12.9716,"lng":77.5946,"accuracy":8,"isoTime":"2025-01-12T10:30:45.000Z"}]}"#,
        )
        .unwrap();
        assert_eq!(detail.evidence.len(), 1);
        assert_eq!(detail.evidence[0].image_url, "https://cdn/x.jpg");
        assert_eq!(detail.evidence[0].accuracy, Some(8.0));
        assert_eq!(detail.summary().status, ComplaintStatus::InProgress);
    }

    #[test]
    fn test_detail_cache_is_bounded() {
        let mut cache = DetailCache::default();
        for i in 0..=COMPLAINT_DETAIL_CACHE_SIZE {
            cache.insert(ComplaintDetail {
                id: ComplaintId::new(i.to_string()),
                ..ComplaintDetail::default()
            });
        }
        assert_eq!(cache.len(), COMPLAINT_DETAIL_CACHE_SIZE);
        assert!(cache.peek(&ComplaintId::new("0")).is_none());
        assert!(cache.get(&ComplaintId::new("1")).is_some());
    }
}
