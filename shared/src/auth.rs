//! Sign-in, registration and password recovery forms, and the session they
//! produce.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::api::{
    AuthResponse, ForgotPasswordRequest, GoogleSignInRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, UserSummary, VerifyOtpRequest,
};
use crate::{AppError, ErrorKind, OTP_LENGTH};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Invalid(String),

    #[error("Please enter the {}-digit code sent to your email", OTP_LENGTH)]
    MalformedOtp,

    #[error("Google sign-in did not return a credential")]
    MissingCredential,

    #[error("The server did not return a session token")]
    MissingToken,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let kind = match e {
            AuthError::MissingToken => ErrorKind::Server,
            AuthError::Invalid(_) | AuthError::MalformedOtp | AuthError::MissingCredential => {
                ErrorKind::Validation
            }
        };
        AppError::new(kind, e.to_string())
    }
}

/// First failing message, taking fields in form order.
pub(crate) fn first_message(errors: &ValidationErrors, order: &[&str]) -> String {
    let fields = errors.field_errors();
    order
        .iter()
        .filter_map(|name| fields.get(*name))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "Please check the form and try again.".to_string())
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthField {
    Name,
    Email,
    Password,
    Otp,
    NewPassword,
}

#[derive(Clone, Default, Validate, PartialEq, Eq)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl std::fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RegisterForm {
    pub fn set(&mut self, field: AuthField, value: String) {
        match field {
            AuthField::Name => self.name = value,
            AuthField::Email => self.email = value,
            AuthField::Password => self.password = value,
            AuthField::Otp | AuthField::NewPassword => {}
        }
    }

    pub fn request(&self) -> Result<RegisterRequest, AuthError> {
        let form = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        form.validate()
            .map_err(|e| AuthError::Invalid(first_message(&e, &["name", "email", "password"])))?;
        Ok(RegisterRequest {
            name: form.name,
            email: form.email,
            password: form.password,
        })
    }
}

#[derive(Clone, Default, Validate, PartialEq, Eq)]
pub struct LoginForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginForm {
    pub fn set(&mut self, field: AuthField, value: String) {
        match field {
            AuthField::Email => self.email = value,
            AuthField::Password => self.password = value,
            AuthField::Name | AuthField::Otp | AuthField::NewPassword => {}
        }
    }

    pub fn request(&self) -> Result<LoginRequest, AuthError> {
        let form = Self {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        form.validate()
            .map_err(|e| AuthError::Invalid(first_message(&e, &["email", "password"])))?;
        Ok(LoginRequest {
            email: form.email,
            password: form.password,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResetStage {
    #[default]
    RequestOtp,
    VerifyOtp,
    NewPassword,
}

/// Forgot-password flow: email, then the emailed code, then a new password.
#[derive(Clone, Default, Validate, PartialEq, Eq)]
pub struct PasswordReset {
    pub stage: ResetStage,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    pub otp: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

impl std::fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordReset")
            .field("stage", &self.stage)
            .field("email", &self.email)
            .field("otp", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}

impl PasswordReset {
    #[must_use]
    pub fn starting_with(email: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, field: AuthField, value: String) {
        match field {
            AuthField::Email if self.stage == ResetStage::RequestOtp => self.email = value,
            AuthField::Otp => self.otp = value,
            AuthField::NewPassword | AuthField::Password => self.new_password = value,
            _ => {}
        }
    }

    fn checked_email(&self) -> Result<String, AuthError> {
        let email = self.email.trim().to_string();
        let probe = Self {
            email: email.clone(),
            ..Self::default()
        };
        if let Err(e) = probe.validate() {
            if e.field_errors().contains_key("email") {
                return Err(AuthError::Invalid(first_message(&e, &["email"])));
            }
        }
        Ok(email)
    }

    fn checked_otp(&self) -> Result<String, AuthError> {
        let otp = self.otp.trim();
        if otp.len() == OTP_LENGTH && otp.bytes().all(|b| b.is_ascii_digit()) {
            Ok(otp.to_string())
        } else {
            Err(AuthError::MalformedOtp)
        }
    }

    pub fn forgot_request(&self) -> Result<ForgotPasswordRequest, AuthError> {
        Ok(ForgotPasswordRequest {
            email: self.checked_email()?,
        })
    }

    pub fn verify_request(&self) -> Result<VerifyOtpRequest, AuthError> {
        Ok(VerifyOtpRequest {
            email: self.checked_email()?,
            otp: self.checked_otp()?,
        })
    }

    pub fn reset_request(&self) -> Result<ResetPasswordRequest, AuthError> {
        let email = self.checked_email()?;
        let otp = self.checked_otp()?;
        let form = Self {
            email,
            otp,
            new_password: self.new_password.clone(),
            stage: self.stage,
        };
        form.validate()
            .map_err(|e| AuthError::Invalid(first_message(&e, &["email", "new_password"])))?;
        Ok(ResetPasswordRequest {
            email: form.email,
            otp: form.otp,
            new_password: form.new_password,
        })
    }

    /// Moves to the next stage; `false` once the last stage is done.
    pub fn advance(&mut self) -> bool {
        self.stage = match self.stage {
            ResetStage::RequestOtp => ResetStage::VerifyOtp,
            ResetStage::VerifyOtp => ResetStage::NewPassword,
            ResetStage::NewPassword => return false,
        };
        true
    }
}

pub fn google_request(credential: &str) -> Result<GoogleSignInRequest, AuthError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(GoogleSignInRequest {
        credential: credential.to_string(),
    })
}

/// State behind the auth screen.
#[derive(Debug, Clone, Default)]
pub struct AuthScreen {
    pub mode: AuthMode,
    pub register: RegisterForm,
    pub login: LoginForm,
    pub reset: Option<PasswordReset>,
    pub submitting: bool,
}

impl AuthScreen {
    pub fn set_field(&mut self, field: AuthField, value: String) {
        if let Some(reset) = self.reset.as_mut() {
            reset.set(field, value);
            return;
        }
        match self.mode {
            AuthMode::Login => self.login.set(field, value),
            AuthMode::Register => self.register.set(field, value),
        }
    }

    pub fn switch_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
        self.reset = None;
    }

    /// Back to a clean login form, keeping the email the user typed.
    pub fn return_to_login(&mut self) {
        let email = self
            .reset
            .take()
            .map(|r| r.email)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.register.email.clone());
        *self = Self {
            login: LoginForm {
                email,
                password: String::new(),
            },
            ..Self::default()
        };
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub user: Option<UserSummary>,
}

impl Session {
    /// `None` when the body carries no usable token.
    #[must_use]
    pub fn from_response(response: &AuthResponse) -> Option<Self> {
        let token = response.token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(Self {
            token: SecretString::new(token.to_string()),
            user: response.user.clone(),
        })
    }
}
