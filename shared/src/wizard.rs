//! The four-step complaint wizard: evidence, location, details, review.
//!
//! The wizard owns the draft and decides whether a step may be left. It
//! never talks to the shell itself; `ComplaintWizard::advance` tells the
//! caller which request, if any, the step needs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{CaptureMeta, ComplaintFormData};
use crate::capture::Capture;
use crate::geocode::AddressSuggestion;
use crate::multipart::{MultipartError, MultipartForm};
use crate::{AppError, CaptureId, ComplaintId, ErrorKind, ValidatedCoordinate, MAX_CAPTURES};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Evidence,
    Location,
    Details,
    Review,
}

impl WizardStep {
    /// 1-based, as shown in the progress bar.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Evidence => 1,
            Self::Location => 2,
            Self::Details => 3,
            Self::Review => 4,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Evidence => "Evidence",
            Self::Location => "Location",
            Self::Details => "Details",
            Self::Review => "Review",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Evidence => Some(Self::Location),
            Self::Location => Some(Self::Details),
            Self::Details => Some(Self::Review),
            Self::Review => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::Evidence | Self::Location => Self::Evidence,
            Self::Details => Self::Location,
            Self::Review => Self::Details,
        }
    }

    /// 0 at the first step, 100 at review.
    #[must_use]
    pub fn progress_percent(self) -> u8 {
        let done = u16::from(self.number() - 1) * 100;
        let span = u16::from(crate::TOTAL_WIZARD_STEPS - 1);
        u8::try_from(done / span).unwrap_or(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintCategory {
    Sanitation,
    Roads,
    Electric,
}

impl ComplaintCategory {
    pub const ALL: [ComplaintCategory; 3] = [Self::Sanitation, Self::Roads, Self::Electric];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sanitation => "Sanitation",
            Self::Roads => "Roads",
            Self::Electric => "Electric",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Evidence,
    Ward,
    Landmark,
    Address,
    Category,
    Description,
    Notes,
}

/// Fields currently marked invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeSet<DraftField>);

impl FieldErrors {
    pub fn mark(&mut self, field: DraftField) {
        self.0.insert(field);
    }

    pub fn clear(&mut self, field: DraftField) {
        self.0.remove(&field);
    }

    #[must_use]
    pub fn contains(&self, field: DraftField) -> bool {
        self.0.contains(&field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DraftField> + '_ {
        self.0.iter().copied()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Please capture at least one photo as evidence")]
    NoEvidence,

    #[error("Maximum {} photos allowed", MAX_CAPTURES)]
    CaptureLimit,

    #[error("Please fill in the highlighted fields")]
    MissingFields(Vec<DraftField>),

    #[error("Please wait, your photos are still being checked")]
    ImagesPending,

    #[error("Your complaint is already being submitted")]
    AlreadySubmitting,
}

impl From<WizardError> for AppError {
    fn from(e: WizardError) -> Self {
        let kind = match e {
            WizardError::NoEvidence | WizardError::MissingFields(_) => ErrorKind::Validation,
            WizardError::CaptureLimit
            | WizardError::ImagesPending
            | WizardError::AlreadySubmitting => ErrorKind::Conflict,
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplaintDraft {
    pub ward: String,
    pub landmark: String,
    pub address: String,
    pub category: Option<ComplaintCategory>,
    pub description: String,
    pub notes: String,
    pub captures: Vec<Capture>,
}

impl ComplaintDraft {
    fn is_blank(value: &str) -> bool {
        value.trim().is_empty()
    }

    fn missing_for(&self, step: WizardStep) -> Vec<DraftField> {
        let mut missing = Vec::new();
        match step {
            WizardStep::Evidence => {
                if self.captures.is_empty() {
                    missing.push(DraftField::Evidence);
                }
            }
            WizardStep::Location => {
                if Self::is_blank(&self.ward) {
                    missing.push(DraftField::Ward);
                }
                if Self::is_blank(&self.address) {
                    missing.push(DraftField::Address);
                }
            }
            WizardStep::Details => {
                if self.category.is_none() {
                    missing.push(DraftField::Category);
                }
                if Self::is_blank(&self.description) {
                    missing.push(DraftField::Description);
                }
            }
            WizardStep::Review => {}
        }
        missing
    }

    /// Coordinates of the first capture that has any.
    #[must_use]
    pub fn location_hint(&self) -> Option<ValidatedCoordinate> {
        self.captures.iter().find_map(Capture::coordinate)
    }

    #[must_use]
    pub fn form_data(&self) -> ComplaintFormData {
        ComplaintFormData {
            ward: self.ward.trim().to_string(),
            landmark: self.landmark.trim().to_string(),
            address: self.address.trim().to_string(),
            category: self
                .category
                .map(ComplaintCategory::label)
                .unwrap_or_default()
                .to_string(),
            description: self.description.trim().to_string(),
            notes: self.notes.trim().to_string(),
        }
    }

    #[must_use]
    pub fn capture_meta(&self) -> Vec<CaptureMeta> {
        self.captures.iter().map(Capture::meta).collect()
    }

    /// Stable for identical content, so a resubmitted draft can be
    /// recognised by the backend.
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        let data = self.form_data();
        let mut hasher = blake3::Hasher::new();
        for field in [
            &data.ward,
            &data.landmark,
            &data.address,
            &data.category,
            &data.description,
            &data.notes,
        ] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        for capture in &self.captures {
            hasher.update(capture.id.0.as_bytes());
            hasher.update(blake3::hash(&capture.image).as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// `data`, `meta` and the images as `evidence_{i}.jpg`, indexed from 0
    /// in capture order.
    pub fn submission_form(&self) -> Result<MultipartForm, MultipartError> {
        let mut form = MultipartForm::new()
            .json("data", &self.form_data())?
            .json("meta", &self.capture_meta())?;
        for (i, capture) in self.captures.iter().enumerate() {
            form = form.file(
                "images",
                format!("evidence_{i}.{}", capture.format.extension()),
                capture.format.mime_type(),
                capture.image.clone(),
            )?;
        }
        Ok(form)
    }

    pub fn validation_form(&self) -> Result<MultipartForm, MultipartError> {
        let mut form = MultipartForm::new();
        for (i, capture) in self.captures.iter().enumerate() {
            form = form.file(
                "images",
                format!("capture_{i}.{}", capture.format.extension()),
                capture.format.mime_type(),
                capture.image.clone(),
            )?;
        }
        Ok(form)
    }
}

/// Verdict of the image-validation backend for the current capture set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ImageCheck {
    #[default]
    Unchecked,
    Checking,
    Passed,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LocationLookup {
    #[default]
    Idle,
    Locating,
    Resolving {
        lat: f64,
        lng: f64,
    },
    Resolved,
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Submission {
    #[default]
    Editing,
    Submitting {
        key: String,
    },
    Succeeded {
        complaint_id: Option<ComplaintId>,
        message: String,
    },
}

/// What `advance` asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(WizardStep),
    ValidateImages,
    Submit,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintWizard {
    pub step: WizardStep,
    pub draft: ComplaintDraft,
    pub errors: FieldErrors,
    pub image_check: ImageCheck,
    pub lookup: LocationLookup,
    pub submission: Submission,
}

impl ComplaintWizard {
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.submission, Submission::Submitting { .. })
    }

    #[must_use]
    pub fn can_add_capture(&self) -> bool {
        self.draft.captures.len() < MAX_CAPTURES
    }

    pub fn advance(&mut self) -> Result<Advance, WizardError> {
        if self.is_submitting() {
            return Err(WizardError::AlreadySubmitting);
        }

        let missing = self.draft.missing_for(self.step);
        if !missing.is_empty() {
            self.errors = FieldErrors::default();
            for field in &missing {
                self.errors.mark(*field);
            }
            return Err(if self.step == WizardStep::Evidence {
                WizardError::NoEvidence
            } else {
                WizardError::MissingFields(missing)
            });
        }

        if self.step == WizardStep::Evidence {
            match self.image_check {
                ImageCheck::Passed => {}
                ImageCheck::Checking => return Err(WizardError::ImagesPending),
                ImageCheck::Unchecked | ImageCheck::Failed(_) => {
                    return Ok(Advance::ValidateImages)
                }
            }
        }

        match self.step.next() {
            Some(next) => {
                self.step = next;
                Ok(Advance::Moved(next))
            }
            None => Ok(Advance::Submit),
        }
    }

    pub fn back(&mut self) -> WizardStep {
        if !self.is_submitting() {
            self.step = self.step.previous();
        }
        self.step
    }

    pub fn add_capture(&mut self, capture: Capture) -> Result<(), WizardError> {
        if !self.can_add_capture() {
            return Err(WizardError::CaptureLimit);
        }
        self.draft.captures.push(capture);
        self.errors.clear(DraftField::Evidence);
        self.image_check = ImageCheck::Unchecked;
        Ok(())
    }

    pub fn remove_capture(&mut self, id: CaptureId) -> Option<Capture> {
        let index = self.draft.captures.iter().position(|c| c.id == id)?;
        self.image_check = ImageCheck::Unchecked;
        Some(self.draft.captures.remove(index))
    }

    pub fn set_field(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::Ward => self.draft.ward = value,
            DraftField::Landmark => self.draft.landmark = value,
            DraftField::Address => self.draft.address = value,
            DraftField::Category => self.draft.category = ComplaintCategory::from_label(&value),
            DraftField::Description => self.draft.description = value,
            DraftField::Notes => self.draft.notes = value,
            DraftField::Evidence => return,
        }
        self.errors.clear(field);
    }

    pub fn begin_image_check(&mut self) {
        self.image_check = ImageCheck::Checking;
    }

    /// Records the verdict; a pass moves the wizard on to the location
    /// step.
    pub fn finish_image_check(&mut self, passed: bool, message: Option<String>) -> bool {
        if passed {
            self.image_check = ImageCheck::Passed;
            if self.step == WizardStep::Evidence {
                self.step = WizardStep::Location;
                return true;
            }
        } else {
            self.image_check = ImageCheck::Failed(message.unwrap_or_else(|| {
                "Some photos could not be verified. Please retake them.".to_string()
            }));
        }
        false
    }

    /// Drops a pending check so the next advance asks again.
    pub fn abandon_image_check(&mut self) {
        if self.image_check == ImageCheck::Checking {
            self.image_check = ImageCheck::Unchecked;
        }
    }

    /// Only non-empty suggestion fields overwrite the draft.
    pub fn apply_suggestion(&mut self, suggestion: &AddressSuggestion) {
        if !suggestion.ward.is_empty() {
            self.draft.ward.clone_from(&suggestion.ward);
        }
        if !suggestion.landmark.is_empty() {
            self.draft.landmark.clone_from(&suggestion.landmark);
        }
        if !suggestion.address.is_empty() {
            self.draft.address.clone_from(&suggestion.address);
        }
        self.errors.clear(DraftField::Ward);
        self.errors.clear(DraftField::Address);
        self.lookup = LocationLookup::Resolved;
    }

    pub fn begin_submit(&mut self) -> Result<String, WizardError> {
        if self.is_submitting() {
            return Err(WizardError::AlreadySubmitting);
        }
        let key = self.draft.idempotency_key();
        self.submission = Submission::Submitting { key: key.clone() };
        Ok(key)
    }

    /// Whether a response carrying `key` still belongs to this draft.
    #[must_use]
    pub fn is_awaiting(&self, key: &str) -> bool {
        matches!(&self.submission, Submission::Submitting { key: k } if k == key)
    }

    /// Clears the draft and shows the confirmation.
    pub fn submit_succeeded(&mut self, complaint_id: Option<ComplaintId>, message: String) {
        *self = Self {
            submission: Submission::Succeeded {
                complaint_id,
                message,
            },
            ..Self::default()
        };
    }

    /// The draft is kept as it was; the user stays on review.
    pub fn submit_failed(&mut self) {
        self.submission = Submission::Editing;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::test_support::{capture, reading};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn wizard_with_capture() -> ComplaintWizard {
        let mut wizard = ComplaintWizard::default();
        wizard
            .add_capture(capture(Some(reading(12.9716, 77.5946, 8.0))))
            .unwrap();
        wizard
    }

    fn wizard_at(step: WizardStep) -> ComplaintWizard {
        let mut wizard = wizard_with_capture();
        wizard.image_check = ImageCheck::Passed;
        wizard.step = step;
        wizard
    }

    #[test]
    fn test_evidence_required() {
        let mut wizard = ComplaintWizard::default();
        assert_eq!(wizard.advance(), Err(WizardError::NoEvidence));
        assert_eq!(wizard.step, WizardStep::Evidence);
        assert!(wizard.errors.contains(DraftField::Evidence));
    }

    #[test]
    fn test_evidence_goes_through_validation() {
        let mut wizard = wizard_with_capture();
        assert_eq!(wizard.advance(), Ok(Advance::ValidateImages));
        wizard.begin_image_check();
        assert_eq!(wizard.advance(), Err(WizardError::ImagesPending));

        assert!(wizard.finish_image_check(true, None));
        assert_eq!(wizard.step, WizardStep::Location);
    }

    #[test]
    fn test_failed_validation_stays() {
        let mut wizard = wizard_with_capture();
        wizard.begin_image_check();
        assert!(!wizard.finish_image_check(false, Some("Blurry photo".into())));
        assert_eq!(wizard.step, WizardStep::Evidence);
        assert_eq!(wizard.image_check, ImageCheck::Failed("Blurry photo".into()));
        assert_eq!(wizard.advance(), Ok(Advance::ValidateImages));
    }

    #[test]
    fn test_capture_change_invalidates_verdict() {
        let mut wizard = wizard_at(WizardStep::Evidence);
        wizard.add_capture(capture(None)).unwrap();
        assert_eq!(wizard.image_check, ImageCheck::Unchecked);

        wizard.image_check = ImageCheck::Passed;
        let id = wizard.draft.captures[0].id;
        wizard.remove_capture(id).unwrap();
        assert_eq!(wizard.image_check, ImageCheck::Unchecked);
    }

    #[test]
    fn test_location_requires_ward_and_address() {
        let mut wizard = wizard_at(WizardStep::Location);
        assert_eq!(
            wizard.advance(),
            Err(WizardError::MissingFields(vec![
                DraftField::Ward,
                DraftField::Address
            ]))
        );
        assert!(wizard.errors.contains(DraftField::Ward));
        assert!(wizard.errors.contains(DraftField::Address));
        assert_eq!(wizard.step, WizardStep::Location);

        wizard.set_field(DraftField::Ward, "Ward 12".into());
        assert!(!wizard.errors.contains(DraftField::Ward));
        assert!(wizard.errors.contains(DraftField::Address));
    }

    #[test]
    fn test_details_requires_category_and_description() {
        let mut wizard = wizard_at(WizardStep::Details);
        wizard.set_field(DraftField::Category, "Plumbing".into());
        assert_matches!(wizard.advance(), Err(WizardError::MissingFields(fields)) => {
            assert_eq!(fields, vec![DraftField::Category, DraftField::Description]);
        });
        assert_eq!(wizard.step, WizardStep::Details);

        wizard.set_field(DraftField::Category, "roads".into());
        wizard.set_field(DraftField::Description, "Pothole near the gate".into());
        assert_eq!(wizard.advance(), Ok(Advance::Moved(WizardStep::Review)));
    }

    #[test]
    fn test_review_triggers_submit() {
        let mut wizard = wizard_at(WizardStep::Review);
        assert_eq!(wizard.advance(), Ok(Advance::Submit));
        let key = wizard.begin_submit().unwrap();
        assert!(wizard.is_awaiting(&key));
        assert_eq!(wizard.advance(), Err(WizardError::AlreadySubmitting));
        assert_eq!(wizard.back(), WizardStep::Review);
    }

    #[test]
    fn test_submit_outcomes() {
        let mut wizard = wizard_at(WizardStep::Review);
        wizard.begin_submit().unwrap();
        wizard.submit_failed();
        assert_eq!(wizard.step, WizardStep::Review);
        assert_eq!(wizard.draft.captures.len(), 1);

        let key = wizard.begin_submit().unwrap();
        wizard.submit_succeeded(Some(ComplaintId::new("1040")), "Complaint registered".into());
        assert!(!wizard.is_awaiting(&key));
        assert!(wizard.draft.captures.is_empty());
        assert_eq!(wizard.step, WizardStep::Evidence);
        assert_matches!(wizard.submission, Submission::Succeeded { .. });
    }

    #[test]
    fn test_fourth_capture_refused() {
        let mut wizard = ComplaintWizard::default();
        for _ in 0..MAX_CAPTURES {
            wizard.add_capture(capture(None)).unwrap();
        }
        assert!(!wizard.can_add_capture());
        assert_eq!(wizard.add_capture(capture(None)), Err(WizardError::CaptureLimit));
        assert_eq!(wizard.draft.captures.len(), MAX_CAPTURES);
    }

    #[test]
    fn test_back_floors_at_evidence() {
        let mut wizard = wizard_at(WizardStep::Details);
        assert_eq!(wizard.back(), WizardStep::Location);
        assert_eq!(wizard.back(), WizardStep::Evidence);
        assert_eq!(wizard.back(), WizardStep::Evidence);
    }

    #[test]
    fn test_location_hint_uses_first_located_capture() {
        let mut wizard = ComplaintWizard::default();
        wizard.add_capture(capture(None)).unwrap();
        assert_eq!(wizard.draft.location_hint(), None);
        wizard
            .add_capture(capture(Some(reading(12.9716, 77.5946, 5.0))))
            .unwrap();
        wizard
            .add_capture(capture(Some(reading(1.0, 1.0, 5.0))))
            .unwrap();
        assert_eq!(wizard.draft.location_hint().unwrap().lat(), 12.9716);
    }

    #[test]
    fn test_suggestion_keeps_manual_values() {
        let mut wizard = wizard_at(WizardStep::Location);
        wizard.set_field(DraftField::Landmark, "Near the temple".into());
        let _ = wizard.advance();

        wizard.apply_suggestion(&AddressSuggestion {
            ward: "Shivajinagar".into(),
            landmark: String::new(),
            address: "MG Road, Bengaluru".into(),
        });
        assert_eq!(wizard.draft.ward, "Shivajinagar");
        assert_eq!(wizard.draft.landmark, "Near the temple");
        assert_eq!(wizard.draft.address, "MG Road, Bengaluru");
        assert!(wizard.errors.is_empty());
        assert_eq!(wizard.lookup, LocationLookup::Resolved);
    }

    #[test]
    fn test_submission_form_parts() {
        let mut wizard = wizard_at(WizardStep::Review);
        wizard.add_capture(capture(None)).unwrap();
        wizard.set_field(DraftField::Ward, "Ward 12".into());
        wizard.set_field(DraftField::Category, "Sanitation".into());

        let body = String::from_utf8_lossy(
            &wizard.draft.submission_form().unwrap().into_body(),
        )
        .into_owned();
        assert!(body.contains("name=\"data\""));
        assert!(body.contains("\"category\":\"Sanitation\""));
        assert!(body.contains("name=\"meta\""));
        assert!(body.contains("\"isoTime\":\"2025-01-12T05:00:45.000Z\""));
        assert!(body.contains("filename=\"evidence_0.jpg\""));
        assert!(body.contains("filename=\"evidence_1.jpg\""));
        assert!(!body.contains("evidence_2"));

        let validation = String::from_utf8_lossy(
            &wizard.draft.validation_form().unwrap().into_body(),
        )
        .into_owned();
        assert!(validation.contains("filename=\"capture_0.jpg\""));
        assert!(validation.contains("filename=\"capture_1.jpg\""));
        assert!(!validation.contains("capture_2"));
    }

    #[test]
    fn test_idempotency_key_tracks_content() {
        let mut wizard = wizard_with_capture();
        let first = wizard.draft.idempotency_key();
        assert_eq!(first, wizard.draft.idempotency_key());
        assert_eq!(first.len(), 64);

        wizard.set_field(DraftField::Notes, "Smells bad".into());
        assert_ne!(first, wizard.draft.idempotency_key());
    }

    #[test]
    fn test_busy_errors_keep_their_message() {
        for e in [WizardError::ImagesPending, WizardError::AlreadySubmitting] {
            let message = e.to_string();
            let err = AppError::from(e);
            assert_eq!(err.user_facing_message(), message);
        }
    }

    #[test]
    fn test_progress() {
        assert_eq!(WizardStep::Evidence.progress_percent(), 0);
        assert_eq!(WizardStep::Location.progress_percent(), 33);
        assert_eq!(WizardStep::Details.progress_percent(), 66);
        assert_eq!(WizardStep::Review.progress_percent(), 100);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Remove(usize),
        Next,
        Back,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            (0usize..4).prop_map(Op::Remove),
            Just(Op::Next),
            Just(Op::Back),
        ]
    }

    proptest! {
        #[test]
        fn prop_capture_count_and_order(ops in prop::collection::vec(op(), 0..40)) {
            let mut wizard = ComplaintWizard::default();
            for op in ops {
                let before: Vec<CaptureId> = wizard.draft.captures.iter().map(|c| c.id).collect();
                match op {
                    Op::Add => {
                        let result = wizard.add_capture(capture(None));
                        prop_assert_eq!(result.is_ok(), before.len() < MAX_CAPTURES);
                    }
                    Op::Remove(i) => {
                        if let Some(id) = before.get(i).copied() {
                            wizard.remove_capture(id);
                            let mut expected = before.clone();
                            expected.remove(i);
                            let after: Vec<CaptureId> =
                                wizard.draft.captures.iter().map(|c| c.id).collect();
                            prop_assert_eq!(after, expected);
                        }
                    }
                    Op::Next => {
                        let _ = wizard.advance();
                        if wizard.image_check == ImageCheck::Unchecked && !wizard.draft.captures.is_empty() {
                            wizard.begin_image_check();
                            wizard.finish_image_check(true, None);
                        }
                    }
                    Op::Back => {
                        wizard.back();
                    }
                }
                prop_assert!(wizard.draft.captures.len() <= MAX_CAPTURES);
                prop_assert!((1..=4).contains(&wizard.step.number()));
            }
        }
    }
}
