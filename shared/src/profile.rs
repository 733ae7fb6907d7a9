use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::auth::first_message;
use crate::image_processing::{self, ImageError};
use crate::multipart::{MultipartError, MultipartForm};
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Female,
    Male,
    #[default]
    NotSelected,
}

impl Gender {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::NotSelected => "Not Selected",
        }
    }
}

impl From<String> for Gender {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "female" => Self::Female,
            "male" => Self::Male,
            _ => Self::NotSelected,
        }
    }
}

impl From<Gender> for String {
    fn from(g: Gender) -> Self {
        g.label().to_string()
    }
}

/// Accepts `2025-01-12`, a full timestamp, or the backend's placeholders.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub gender: Gender,
    #[serde(deserialize_with = "lenient_date")]
    pub dob: Option<NaiveDate>,
    pub image: String,
}

impl UserProfile {
    /// `12 January 2025`
    #[must_use]
    pub fn dob_label(&self) -> String {
        self.dob
            .map_or_else(|| "Not Selected".to_string(), |d| d.format("%-d %B %Y").to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Phone,
    Address,
    Gender,
    Dob,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AvatarChange {
    #[default]
    Keep,
    Replace {
        bytes: Vec<u8>,
        preview_url: String,
    },
    Remove,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("{0}")]
    Invalid(String),

    #[error("profile is not being edited")]
    NotEditing,

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl From<ProfileError> for AppError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::Invalid(message) => AppError::new(ErrorKind::Validation, message),
            ProfileError::NotEditing => {
                AppError::new(ErrorKind::InvalidState, "profile is not being edited")
            }
            ProfileError::Image(inner) => inner.into(),
            ProfileError::Multipart(inner) => inner.into(),
        }
    }
}

#[derive(Validate)]
struct ProfileInput {
    #[validate(length(min = 1, message = "Name is required"))]
    name: String,
    #[validate(length(max = 20, message = "Phone number is too long"))]
    phone: String,
}

/// Edit mode for the profile page. `original` is the snapshot cancel
/// restores; `None` when not editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEditor {
    original: Option<UserProfile>,
    pub draft: UserProfile,
    pub avatar: AvatarChange,
    pub saving: bool,
}

impl ProfileEditor {
    pub fn start(&mut self, profile: &UserProfile) {
        self.original = Some(profile.clone());
        self.draft = profile.clone();
        self.avatar = AvatarChange::Keep;
        self.saving = false;
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        self.original.is_some()
    }

    pub fn set_field(&mut self, field: ProfileField, value: String) {
        match field {
            ProfileField::Name => self.draft.name = value,
            ProfileField::Phone => self.draft.phone = value,
            ProfileField::Address => self.draft.address = value,
            ProfileField::Gender => self.draft.gender = Gender::from(value),
            ProfileField::Dob => self.draft.dob = parse_date(&value),
        }
    }

    pub fn replace_avatar(&mut self, bytes: Vec<u8>) -> Result<(), ProfileError> {
        let format = image_processing::sniff(&bytes)?;
        let preview_url = image_processing::data_url(format.mime_type(), &bytes);
        self.avatar = AvatarChange::Replace { bytes, preview_url };
        Ok(())
    }

    pub fn remove_avatar(&mut self) {
        self.avatar = AvatarChange::Remove;
    }

    /// Drops the edits and returns the snapshot taken on start.
    pub fn cancel(&mut self) -> Option<UserProfile> {
        let original = self.original.take();
        *self = Self::default();
        original
    }

    pub fn finish(&mut self) {
        *self = Self::default();
    }

    /// Avatar shown while editing.
    #[must_use]
    pub fn avatar_url(&self) -> Option<String> {
        match &self.avatar {
            AvatarChange::Keep => Some(self.draft.image.clone()).filter(|s| !s.is_empty()),
            AvatarChange::Replace { preview_url, .. } => Some(preview_url.clone()),
            AvatarChange::Remove => None,
        }
    }

    pub fn update_form(&self) -> Result<MultipartForm, ProfileError> {
        if !self.is_editing() {
            return Err(ProfileError::NotEditing);
        }
        let input = ProfileInput {
            name: self.draft.name.trim().to_string(),
            phone: self.draft.phone.trim().to_string(),
        };
        input
            .validate()
            .map_err(|e| ProfileError::Invalid(first_message(&e, &["name", "phone"])))?;

        let dob = self
            .draft
            .dob
            .map_or_else(|| "null".to_string(), |d| d.format("%Y-%m-%d").to_string());

        let form = MultipartForm::new()
            .text("name", input.name)?
            .text("phone", input.phone)?
            .json("address", &self.draft.address)?
            .text("gender", self.draft.gender.label())?
            .text("dob", dob)?;

        let form = match &self.avatar {
            AvatarChange::Keep => form,
            AvatarChange::Replace { bytes, .. } => {
                let format = image_processing::sniff(bytes)?;
                form.file(
                    "image",
                    format!("avatar.{}", format.extension()),
                    format.mime_type(),
                    bytes.clone(),
                )?
            }
            AvatarChange::Remove => form.text("removeImage", "true")?,
        };
        Ok(form)
    }
}
