//! The Crux app: routes every event to the module that owns the state and
//! turns their decisions into capability requests.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{
    self, endpoints, ApiEnvelope, AuthResponse, ComplaintDetailResponse, ComplaintListResponse,
    ImageValidationResponse, NotificationListResponse, ProfileResponse, SubmitComplaintResponse,
};
use crate::auth::{self, AuthError, AuthScreen, PasswordReset, ResetStage, Session};
use crate::capabilities::http::{bearer, into_body, ContentType};
use crate::capabilities::kv::{decode_session, encode_session};
use crate::capabilities::{
    CameraError, CameraFacing, CameraOutput, CameraResult, Capabilities, CaptureConfig,
    GeoReading, GeolocationResult, HttpResult, KvKey, KvResult, PositionOptions,
};
use crate::capture::{CameraSession, CameraStatus, Capture};
use crate::event::Event;
use crate::geocode;
use crate::image_processing::make_preview;
use crate::model::Model;
use crate::multipart::MultipartForm;
use crate::notifications;
use crate::view::{self, ViewModel};
use crate::wizard::{Advance, ImageCheck, LocationLookup, WizardError};
use crate::{
    get_current_time_ms, AppError, AppResult, ComplaintId, ErrorKind, PermissionState,
    Presentation, Route, ToastKind, ValidatedCoordinate, CAPTURE_JPEG_QUALITY,
    LOGIN_REQUIRED_MESSAGE, SESSION_EXPIRED_MESSAGE,
};

#[derive(Default)]
pub struct App;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

enum Payload {
    Empty,
    Json(Vec<u8>),
    Form(MultipartForm),
}

impl Payload {
    fn json<T: Serialize>(body: &T) -> AppResult<Self> {
        serde_json::to_vec(body).map(Self::Json).map_err(|e| {
            AppError::new(ErrorKind::Serialization, "Could not prepare the request")
                .with_internal(e.to_string())
        })
    }
}

/// One backend request. Calls carry the session's bearer token unless
/// made `public`.
struct ApiCall<'a> {
    method: Method,
    path: &'a str,
    payload: Payload,
    authenticated: bool,
    idempotency_key: Option<String>,
}

impl<'a> ApiCall<'a> {
    fn get(path: &'a str) -> Self {
        Self {
            method: Method::Get,
            path,
            payload: Payload::Empty,
            authenticated: true,
            idempotency_key: None,
        }
    }

    fn post(path: &'a str, payload: Payload) -> Self {
        Self {
            method: Method::Post,
            path,
            payload,
            authenticated: true,
            idempotency_key: None,
        }
    }

    fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }

    fn idempotent(mut self, key: String) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    fn send<F>(self, model: &Model, caps: &Capabilities, make_event: F) -> AppResult<()>
    where
        F: FnOnce(HttpResult) -> Event + Send + 'static,
    {
        let url = model.config.api_url(self.path)?;
        let authorization = if self.authenticated {
            let session = model.session.as_ref().ok_or_else(|| {
                AppError::new(ErrorKind::Authentication, "Not signed in")
                    .with_context("path", self.path)
            })?;
            Some(bearer(&session.token))
        } else {
            None
        };

        let builder = match self.method {
            Method::Get => caps.http.get(url.as_str()),
            Method::Post => caps.http.post(url.as_str()),
        };

        // Body first: setting it resets the content type.
        let mut builder = match self.payload {
            Payload::Empty => builder,
            Payload::Json(bytes) => builder
                .body_bytes(bytes)
                .header("Content-Type", ContentType::Json.header_value().as_str()),
            Payload::Form(form) => {
                let content_type = form.content_type();
                builder
                    .body_bytes(form.into_body())
                    .header("Content-Type", content_type.as_str())
            }
        };

        if let Some(authorization) = authorization {
            builder = builder.header("Authorization", authorization.as_str());
        }
        if let Some(key) = self.idempotency_key {
            builder = builder.header("Idempotency-Key", key.as_str());
        }

        debug!(method = ?self.method, path = self.path, "sending request");
        builder.send(make_event);
        Ok(())
    }
}

/// Auth endpoints answer bad credentials with 401, which must not be read
/// as an expired session.
fn public_error_message(err: &AppError) -> String {
    match err.kind {
        ErrorKind::Network | ErrorKind::Serialization | ErrorKind::Deserialization => {
            err.user_facing_message()
        }
        _ if err.message.trim().is_empty() => err.user_facing_message(),
        _ => err.message.clone(),
    }
}

fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

impl App {
    // ---- Error reporting --------------------------------------------------

    fn report(model: &mut Model, caps: &Capabilities, err: &AppError) {
        warn!(code = err.code(), error = %err, "request failed");
        match err.presentation() {
            Presentation::SignInRedirect => Self::expire_session(model, caps),
            Presentation::BlockingAlert => {
                Self::teardown_camera(model, caps);
                model.alert = Some(err.user_facing_message());
            }
            Presentation::Inline => model.show_toast(err.user_facing_message(), ToastKind::Warning),
            Presentation::Toast | Presentation::NotFoundPage => {
                model.show_toast(err.user_facing_message(), ToastKind::Error);
            }
        }
    }

    fn report_public(model: &mut Model, err: &AppError) {
        warn!(code = err.code(), error = %err, "auth request failed");
        model.show_toast(public_error_message(err), ToastKind::Error);
    }

    // ---- Session ------------------------------------------------------------

    fn establish_session(model: &mut Model, caps: &Capabilities, session: Session, toast: &str) {
        match encode_session(&session.token, get_current_time_ms()) {
            Ok(bytes) => caps.key_value.set(KvKey::session_token().raw(), bytes, |r| {
                Event::SessionStored(Box::new(r))
            }),
            Err(e) => warn!(error = %e, "session not persisted"),
        }

        info!(
            user = session.user.as_ref().and_then(|u| u.id.as_deref()).unwrap_or("unknown"),
            "signed in"
        );
        model.session = Some(session);
        model.auth = AuthScreen::default();
        model.auth_notice = None;
        model.show_toast(toast, ToastKind::Success);

        Self::fetch_profile(model, caps);
        let target = model.redirect_after_login.take().unwrap_or(Route::Home);
        Self::navigate(model, caps, target);
    }

    fn forget_stored_session(caps: &Capabilities) {
        caps.key_value.delete(KvKey::session_token().raw(), |r| {
            Event::SessionDeleted(Box::new(r))
        });
    }

    /// A 401 from the backend: drop everything and send the user to sign
    /// in, coming back to where they were afterwards.
    fn expire_session(model: &mut Model, caps: &Capabilities) {
        info!("session expired");
        Self::forget_stored_session(caps);
        Self::teardown_camera(model, caps);
        model.clear_session();
        if model.route.requires_auth() {
            model.redirect_after_login = Some(model.route.clone());
        }
        model.auth = AuthScreen::default();
        model.auth_notice = Some(SESSION_EXPIRED_MESSAGE.into());
        model.route = Route::Auth;
    }

    fn on_session_loaded(model: &mut Model, caps: &Capabilities, result: KvResult) {
        model.session_checked = true;
        let bytes = match result {
            Ok(Some(bytes)) if !bytes.is_empty() => bytes,
            Ok(_) => {
                debug!("no stored session");
                return;
            }
            Err(e) => {
                warn!(error = %e, "could not read stored session");
                return;
            }
        };

        match decode_session(&bytes) {
            Ok((token, saved_at_ms)) => {
                info!(saved_at_ms, "session restored");
                model.session = Some(Session { token, user: None });
                Self::fetch_profile(model, caps);
                if model.route == Route::Auth {
                    let target = model.redirect_after_login.take().unwrap_or(Route::Home);
                    Self::navigate(model, caps, target);
                } else {
                    Self::enter_route(model, caps);
                }
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable session");
                Self::forget_stored_session(caps);
            }
        }
    }

    fn auth_response(result: HttpResult, fallback: &str) -> AppResult<AuthResponse> {
        into_body(result).and_then(|body| api::decode_checked(&body, fallback))
    }

    fn sign_in_with(model: &mut Model, caps: &Capabilities, result: HttpResult) {
        model.auth.submitting = false;
        match Self::auth_response(result, "Login failed") {
            Ok(response) => match Session::from_response(&response) {
                Some(session) => Self::establish_session(model, caps, session, "Login successful"),
                None => Self::report_public(model, &AppError::from(AuthError::MissingToken)),
            },
            Err(e) => Self::report_public(model, &e),
        }
    }

    fn submit_auth<T: Serialize>(
        model: &mut Model,
        caps: &Capabilities,
        path: &'static str,
        request: Result<T, AuthError>,
        make_event: fn(Box<HttpResult>) -> Event,
    ) {
        if model.auth.submitting {
            return;
        }
        let sent = request
            .map_err(AppError::from)
            .and_then(|body| Payload::json(&body))
            .and_then(|payload| {
                ApiCall::post(path, payload)
                    .public()
                    .send(model, caps, move |r| make_event(Box::new(r)))
            });
        match sent {
            Ok(()) => model.auth.submitting = true,
            Err(e) if e.kind == ErrorKind::Validation => {
                model.show_toast(e.message, ToastKind::Warning);
            }
            Err(e) => Self::report_public(model, &e),
        }
    }

    fn on_password_reset_response(model: &mut Model, result: HttpResult) {
        model.auth.submitting = false;
        let response = into_body(result)
            .and_then(|body| api::decode_checked::<ApiEnvelope>(&body, "Request failed"));
        let envelope = match response {
            Ok(envelope) => envelope,
            Err(e) => return Self::report_public(model, &e),
        };
        let Some(reset) = model.auth.reset.as_mut() else {
            return;
        };

        let finished_stage = reset.stage;
        let message = envelope.into_message();
        if reset.advance() {
            let fallback = match finished_stage {
                ResetStage::RequestOtp => "OTP sent to your email",
                _ => "OTP verified",
            };
            model.show_toast(message.unwrap_or_else(|| fallback.into()), ToastKind::Success);
        } else {
            info!("password reset completed");
            model.auth.return_to_login();
            model.show_toast(
                message.unwrap_or_else(|| "Password reset successfully".into()),
                ToastKind::Success,
            );
        }
    }

    // ---- Navigation -------------------------------------------------------

    fn navigate(model: &mut Model, caps: &Capabilities, route: Route) {
        if route.requires_auth() && !model.is_authenticated() {
            info!(path = %route.path(), "sign-in required");
            Self::leave_route(model, caps, &Route::Auth);
            model.redirect_after_login = Some(route);
            model.auth_notice = Some(LOGIN_REQUIRED_MESSAGE.into());
            model.route = Route::Auth;
            return;
        }

        let route = if route == Route::Auth && model.is_authenticated() {
            Route::Home
        } else {
            route
        };
        if route == Route::Auth {
            model.auth_notice = None;
        }

        Self::leave_route(model, caps, &route);
        model.route = route;
        Self::enter_route(model, caps);
    }

    fn leave_route(model: &mut Model, caps: &Capabilities, next: &Route) {
        if model.route == *next {
            return;
        }
        match model.route {
            Route::RegisterComplaint => {
                Self::teardown_camera(model, caps);
                model.wizard.reset();
            }
            Route::Profile => model.profile_editor.finish(),
            _ => {}
        }
    }

    fn enter_route(model: &mut Model, caps: &Capabilities) {
        match model.route.clone() {
            Route::Dashboard | Route::MyComplaints => Self::fetch_complaints(model, caps),
            Route::ComplaintDetail(id) => Self::fetch_detail(model, caps, id),
            Route::Profile => Self::fetch_profile(model, caps),
            Route::Notifications => Self::fetch_notifications(model, caps),
            Route::Home | Route::Auth | Route::RegisterComplaint | Route::NotFound => {}
        }
    }

    // ---- Fetches ------------------------------------------------------------

    fn fetch_profile(model: &mut Model, caps: &Capabilities) {
        match ApiCall::get(endpoints::PROFILE).send(model, caps, |r| {
            Event::ProfileFetched(Box::new(r))
        }) {
            Ok(()) => model.loading.profile = true,
            Err(e) => Self::report(model, caps, &e),
        }
    }

    fn fetch_complaints(model: &mut Model, caps: &Capabilities) {
        match ApiCall::get(endpoints::COMPLAINTS).send(model, caps, |r| {
            Event::ComplaintsFetched(Box::new(r))
        }) {
            Ok(()) => model.loading.complaints = true,
            Err(e) => Self::report(model, caps, &e),
        }
    }

    fn fetch_detail(model: &mut Model, caps: &Capabilities, id: ComplaintId) {
        if model.details.get(&id).is_some() {
            debug!(complaint = %id, "detail served from cache");
            return;
        }
        let path = endpoints::complaint_detail(&id);
        match ApiCall::get(&path).send(model, caps, move |r| Event::ComplaintDetailFetched {
            id,
            result: Box::new(r),
        }) {
            Ok(()) => model.loading.detail = true,
            Err(e) => Self::report(model, caps, &e),
        }
    }

    fn fetch_notifications(model: &mut Model, caps: &Capabilities) {
        match ApiCall::get(endpoints::NOTIFICATIONS).send(model, caps, |r| {
            Event::NotificationsFetched(Box::new(r))
        }) {
            Ok(()) => model.loading.notifications = true,
            Err(e) => Self::report(model, caps, &e),
        }
    }

    fn on_detail_fetched(model: &mut Model, caps: &Capabilities, id: ComplaintId, result: HttpResult) {
        model.loading.detail = false;
        let detail = into_body(result)
            .and_then(|body| {
                api::decode_checked::<ComplaintDetailResponse>(&body, "Could not load complaint")
            })
            .and_then(|response| {
                response
                    .complaint
                    .ok_or_else(|| AppError::new(ErrorKind::NotFound, "Complaint not found"))
            });

        match detail {
            Ok(mut detail) => {
                if detail.id.as_str().is_empty() {
                    detail.id = id;
                }
                model.details.insert(detail);
            }
            Err(e) if e.kind == ErrorKind::NotFound => {
                warn!(complaint = %id, "complaint not found");
                if model.route == Route::ComplaintDetail(id) {
                    model.route = Route::NotFound;
                }
            }
            Err(e) => Self::report(model, caps, &e),
        }
    }

    // ---- Camera -------------------------------------------------------------

    /// Stops the media stream and the location watch. Does nothing when
    /// no camera session is open.
    fn teardown_camera(model: &mut Model, caps: &Capabilities) {
        if model.camera.take().is_some() {
            debug!("closing camera session");
            caps.camera.close();
            caps.geolocation.clear_watch();
        }
    }

    fn open_camera(model: &mut Model, caps: &Capabilities) {
        if model.camera.is_some() {
            return;
        }
        if !model.wizard.can_add_capture() {
            model.show_toast(WizardError::CaptureLimit.to_string(), ToastKind::Warning);
            return;
        }

        model.camera = Some(CameraSession::opening());
        model.camera_permission = PermissionState::Requesting;
        caps.camera.open(CameraFacing::Back, |r| Event::CameraOpened(Box::new(r)));
        caps.geolocation.watch(PositionOptions::high_accuracy(), |r| {
            Event::PositionUpdated(Box::new(r))
        });
    }

    fn on_camera_opened(model: &mut Model, caps: &Capabilities, result: CameraResult) {
        match result {
            Ok(CameraOutput::Opened) => {
                model.camera_permission = PermissionState::Granted;
                match model.camera.as_mut() {
                    Some(session) => session.status = CameraStatus::Live,
                    // Closed before the stream came up.
                    None => caps.camera.close(),
                }
            }
            Ok(CameraOutput::Photo(_)) => warn!("camera answered open with a photo"),
            Err(e) => {
                if e == CameraError::PermissionDenied {
                    model.camera_permission = PermissionState::Denied;
                }
                Self::teardown_camera(model, caps);
                Self::report(model, caps, &AppError::from(e));
            }
        }
    }

    fn on_position_updated(model: &mut Model, caps: &Capabilities, result: GeolocationResult) {
        let Some(session) = model.camera.as_mut() else {
            return;
        };
        match result {
            Ok(position) => match GeoReading::try_from(position) {
                Ok(reading) => {
                    session.record(reading);
                    model.location_permission = PermissionState::Granted;
                }
                Err(e) => debug!(error = %e, "ignoring invalid position"),
            },
            Err(e) if e.is_permission_error() => {
                model.location_permission = PermissionState::Denied;
                Self::report(model, caps, &AppError::from(e));
            }
            Err(e) => warn!(error = %e, "position update failed"),
        }
    }

    fn shutter(model: &mut Model, caps: &Capabilities) {
        if !model.wizard.can_add_capture() {
            model.show_toast(WizardError::CaptureLimit.to_string(), ToastKind::Warning);
            Self::teardown_camera(model, caps);
            return;
        }
        let Some(session) = model.camera.as_mut() else {
            return;
        };
        if !session.can_shoot() {
            return;
        }
        session.status = CameraStatus::Capturing;
        caps.camera.capture(
            CaptureConfig::default().with_quality(CAPTURE_JPEG_QUALITY),
            |r| Event::PhotoCaptured(Box::new(r)),
        );
    }

    fn on_photo_captured(model: &mut Model, caps: &Capabilities, result: CameraResult) {
        let Some(session) = model.camera.as_ref() else {
            debug!("photo arrived after the camera closed");
            return;
        };
        let reading = session.latest_reading;

        let outcome = match result {
            Ok(CameraOutput::Photo(image)) => image
                .checked()
                .map_err(AppError::from)
                .and_then(|image| {
                    let (width, height) = image.dimensions();
                    debug!(width, height, bytes = image.data().len(), "photo received");
                    make_preview(image.data())
                        .map_err(AppError::from)
                        .map(|preview| Capture::new(image, preview, reading, Utc::now()))
                }),
            Ok(CameraOutput::Opened) => Err(AppError::new(
                ErrorKind::Camera,
                "camera answered capture without a photo",
            )),
            Err(e) => Err(AppError::from(e)),
        };

        Self::teardown_camera(model, caps);
        match outcome {
            Ok(capture) => {
                let located = capture.reading.is_some();
                match model.wizard.add_capture(capture) {
                    Ok(()) => info!(
                        count = model.wizard.draft.captures.len(),
                        located, "evidence captured"
                    ),
                    Err(e) => model.show_toast(e.to_string(), ToastKind::Warning),
                }
            }
            Err(e) => Self::report(model, caps, &e),
        }
    }

    // ---- Wizard -------------------------------------------------------------

    fn next_step(model: &mut Model, caps: &Capabilities) {
        match model.wizard.advance() {
            Ok(Advance::Moved(step)) => debug!(step = step.number(), "wizard advanced"),
            Ok(Advance::ValidateImages) => Self::validate_images(model, caps),
            Ok(Advance::Submit) => Self::submit_complaint(model, caps),
            Err(e) => Self::report(model, caps, &AppError::from(e)),
        }
    }

    fn validate_images(model: &mut Model, caps: &Capabilities) {
        let sent = model
            .wizard
            .draft
            .validation_form()
            .map_err(AppError::from)
            .and_then(|form| {
                ApiCall::post(endpoints::VALIDATE_IMAGES, Payload::Form(form)).send(
                    model,
                    caps,
                    |r| Event::ImagesValidated(Box::new(r)),
                )
            });
        match sent {
            Ok(()) => model.wizard.begin_image_check(),
            Err(e) => Self::report(model, caps, &e),
        }
    }

    fn on_images_validated(model: &mut Model, caps: &Capabilities, result: HttpResult) {
        if model.wizard.image_check != ImageCheck::Checking {
            debug!("ignoring verdict for a changed capture set");
            return;
        }
        let verdict = into_body(result)
            .and_then(|body| api::decode::<ImageValidationResponse>(&body));
        match verdict {
            Ok(verdict) => {
                let passed = verdict.all_valid;
                model
                    .wizard
                    .finish_image_check(passed, non_empty(verdict.message));
                if let ImageCheck::Failed(message) = &model.wizard.image_check {
                    let message = message.clone();
                    model.show_toast(message, ToastKind::Error);
                }
                info!(passed, "image check finished");
            }
            Err(e) => {
                model.wizard.abandon_image_check();
                Self::report(model, caps, &e);
            }
        }
    }

    fn submit_complaint(model: &mut Model, caps: &Capabilities) {
        let key = match model.wizard.begin_submit() {
            Ok(key) => key,
            Err(e) => return Self::report(model, caps, &AppError::from(e)),
        };

        let reply_key = key.clone();
        let sent = model
            .wizard
            .draft
            .submission_form()
            .map_err(AppError::from)
            .and_then(|form| {
                ApiCall::post(endpoints::REGISTER_COMPLAINT, Payload::Form(form))
                    .idempotent(key)
                    .send(model, caps, move |r| Event::ComplaintSubmitted {
                        key: reply_key,
                        result: Box::new(r),
                    })
            });

        if let Err(e) = sent {
            model.wizard.submit_failed();
            Self::report(model, caps, &e);
        }
    }

    fn on_complaint_submitted(
        model: &mut Model,
        caps: &Capabilities,
        key: &str,
        result: HttpResult,
    ) {
        if !model.wizard.is_awaiting(key) {
            info!("ignoring response for a discarded draft");
            return;
        }
        let response = into_body(result).and_then(|body| {
            api::decode_checked::<SubmitComplaintResponse>(&body, "Complaint submission failed")
        });
        match response {
            Ok(response) => {
                let message = non_empty(response.message)
                    .unwrap_or_else(|| "Complaint registered successfully".into());
                let id = non_empty(response.complaint_id).map(ComplaintId::new);
                info!(complaint = ?id, "complaint registered");
                model.wizard.submit_succeeded(id, message.clone());
                model.complaints.clear();
                model.show_toast(message, ToastKind::Success);
            }
            Err(e) => {
                model.wizard.submit_failed();
                Self::report(model, caps, &e);
            }
        }
    }

    // ---- Location step -----------------------------------------------------

    fn detect_location(model: &mut Model, caps: &Capabilities) {
        if matches!(
            model.wizard.lookup,
            LocationLookup::Locating | LocationLookup::Resolving { .. }
        ) {
            return;
        }
        match model.wizard.draft.location_hint() {
            Some(at) => Self::reverse_geocode(model, caps, at),
            None => {
                model.wizard.lookup = LocationLookup::Locating;
                caps.geolocation
                    .current_position(PositionOptions::high_accuracy(), |r| {
                        Event::CurrentPositionReceived(Box::new(r))
                    });
            }
        }
    }

    fn on_current_position(model: &mut Model, caps: &Capabilities, result: GeolocationResult) {
        if model.wizard.lookup != LocationLookup::Locating {
            return;
        }
        let at = result.map_err(AppError::from).and_then(|p| {
            ValidatedCoordinate::new(p.lat, p.lng).map_err(AppError::from)
        });
        match at {
            Ok(at) => Self::reverse_geocode(model, caps, at),
            Err(e) => {
                if e.kind == ErrorKind::LocationPermissionDenied {
                    model.location_permission = PermissionState::Denied;
                }
                warn!(error = %e, "no position for the location step");
                let message = AppError::new(ErrorKind::Location, "").user_facing_message();
                Self::fail_lookup(model, message);
            }
        }
    }

    fn reverse_geocode(model: &mut Model, caps: &Capabilities, at: ValidatedCoordinate) {
        match geocode::reverse_url(&model.config, at) {
            Ok(url) => {
                model.wizard.lookup = LocationLookup::Resolving {
                    lat: at.lat(),
                    lng: at.lng(),
                };
                caps.http
                    .get(url.as_str())
                    .header("User-Agent", model.config.geocoder_user_agent.as_str())
                    .header("Accept", "application/json")
                    .send(|r| Event::AddressResolved(Box::new(r)));
            }
            Err(e) => {
                let err = AppError::from(e);
                warn!(error = %err, "cannot build geocoder request");
                Self::fail_lookup(model, err.user_facing_message());
            }
        }
    }

    fn on_address_resolved(model: &mut Model, result: HttpResult) {
        if !matches!(model.wizard.lookup, LocationLookup::Resolving { .. }) {
            return;
        }
        let suggestion = into_body(result)
            .and_then(|body| geocode::parse_reverse(&body).map_err(AppError::from));
        match suggestion {
            Ok(suggestion) => {
                debug!(ward = %suggestion.ward, "address resolved");
                model.wizard.apply_suggestion(&suggestion);
            }
            Err(e) => {
                warn!(error = %e, "reverse geocoding failed");
                let message = AppError::new(ErrorKind::Geocoding, "").user_facing_message();
                Self::fail_lookup(model, message);
            }
        }
    }

    fn fail_lookup(model: &mut Model, message: String) {
        model.show_toast(message.clone(), ToastKind::Warning);
        model.wizard.lookup = LocationLookup::Failed { message };
    }

    // ---- Profile ------------------------------------------------------------

    fn save_profile(model: &mut Model, caps: &Capabilities) {
        if model.profile_editor.saving {
            return;
        }
        let sent = model
            .profile_editor
            .update_form()
            .map_err(AppError::from)
            .and_then(|form| {
                ApiCall::post(endpoints::UPDATE_PROFILE, Payload::Form(form)).send(
                    model,
                    caps,
                    |r| Event::ProfileSaved(Box::new(r)),
                )
            });
        match sent {
            Ok(()) => model.profile_editor.saving = true,
            Err(e) => Self::report(model, caps, &e),
        }
    }

    fn on_profile_saved(model: &mut Model, caps: &Capabilities, result: HttpResult) {
        model.profile_editor.saving = false;
        let response = into_body(result)
            .and_then(|body| api::decode_checked::<ApiEnvelope>(&body, "Profile update failed"));
        match response {
            Ok(envelope) => {
                let message = envelope
                    .into_message()
                    .unwrap_or_else(|| "Profile updated successfully".into());
                model.profile_editor.finish();
                model.show_toast(message, ToastKind::Success);
                Self::fetch_profile(model, caps);
            }
            Err(e) => Self::report(model, caps, &e),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "update");

        match event {
            Event::AppStarted { config } => {
                match config.validate() {
                    Ok(()) => model.config = config,
                    Err(e) => warn!(error = %e, "invalid configuration, keeping defaults"),
                }
                caps.key_value.get(KvKey::session_token().raw(), |r| {
                    Event::SessionLoaded(Box::new(r))
                });
            }
            Event::Tick { now_ms } => model.expire_toast(now_ms),
            Event::Navigate(route) => Self::navigate(model, caps, route),
            Event::NavigateToPath(path) => Self::navigate(model, caps, Route::from_path(&path)),
            Event::DismissToast => model.toast = None,
            Event::DismissAlert => model.alert = None,

            // Auth
            Event::AuthModeChanged(mode) => model.auth.switch_mode(mode),
            Event::AuthFieldChanged { field, value } => model.auth.set_field(field, value),
            Event::LoginSubmitted => {
                let request = model.auth.login.request();
                Self::submit_auth(model, caps, endpoints::LOGIN, request, Event::LoginResponse);
            }
            Event::RegisterSubmitted => {
                let request = model.auth.register.request();
                Self::submit_auth(
                    model,
                    caps,
                    endpoints::REGISTER,
                    request,
                    Event::RegisterResponse,
                );
            }
            Event::GoogleCredentialReceived(credential) => {
                let request = auth::google_request(&credential);
                Self::submit_auth(
                    model,
                    caps,
                    endpoints::GOOGLE_SIGN_IN,
                    request,
                    Event::GoogleSignInResponse,
                );
            }
            Event::ForgotPasswordStarted => {
                model.auth.reset = Some(PasswordReset::starting_with(&model.auth.login.email));
            }
            Event::PasswordResetSubmitted => {
                let Some(reset) = model.auth.reset.as_ref() else {
                    warn!("password reset submitted without a reset in progress");
                    caps.render.render();
                    return;
                };
                match reset.stage {
                    ResetStage::RequestOtp => {
                        let request = reset.forgot_request();
                        Self::submit_auth(
                            model,
                            caps,
                            endpoints::FORGOT_PASSWORD,
                            request,
                            Event::PasswordResetResponse,
                        );
                    }
                    ResetStage::VerifyOtp => {
                        let request = reset.verify_request();
                        Self::submit_auth(
                            model,
                            caps,
                            endpoints::VERIFY_OTP,
                            request,
                            Event::PasswordResetResponse,
                        );
                    }
                    ResetStage::NewPassword => {
                        let request = reset.reset_request();
                        Self::submit_auth(
                            model,
                            caps,
                            endpoints::RESET_PASSWORD,
                            request,
                            Event::PasswordResetResponse,
                        );
                    }
                }
            }
            Event::PasswordResetCancelled => model.auth.return_to_login(),
            Event::Logout => {
                info!("signed out");
                Self::forget_stored_session(caps);
                Self::teardown_camera(model, caps);
                model.clear_session();
                model.redirect_after_login = None;
                model.auth = AuthScreen::default();
                model.auth_notice = None;
                model.alert = None;
                model.route = Route::Auth;
                model.show_toast("Logged out", ToastKind::Info);
            }

            // Profile
            Event::EditProfile => {
                if let Some(profile) = model.profile.as_ref() {
                    model.profile_editor.start(profile);
                }
            }
            Event::ProfileFieldChanged { field, value } => {
                model.profile_editor.set_field(field, value);
            }
            Event::AvatarSelected(bytes) => {
                if let Err(e) = model.profile_editor.replace_avatar(bytes) {
                    Self::report(model, caps, &AppError::from(e));
                }
            }
            Event::AvatarRemoved => model.profile_editor.remove_avatar(),
            Event::SaveProfile => Self::save_profile(model, caps),
            Event::CancelProfileEdit => {
                if let Some(original) = model.profile_editor.cancel() {
                    model.profile = Some(original);
                }
            }

            // Complaints & notifications
            Event::RefreshComplaints => {
                model.details.clear();
                Self::fetch_complaints(model, caps);
            }
            Event::SearchChanged(term) => model.complaint_filter.search = term,
            Event::CategoryFilterChanged(category) => {
                model.complaint_filter.category =
                    category.filter(|c| !c.trim().is_empty() && !c.eq_ignore_ascii_case("all"));
            }
            Event::StatusFilterChanged(status) => model.complaint_filter.status = status,
            Event::RefreshNotifications => Self::fetch_notifications(model, caps),
            Event::NotificationOpened(id) => {
                let target = notifications::mark_read(&mut model.notifications, &id);
                let path = endpoints::mark_notification_read(&id);
                if let Err(e) = ApiCall::post(&path, Payload::Empty).send(model, caps, |r| {
                    Event::NotificationMarked(Box::new(r))
                }) {
                    Self::report(model, caps, &e);
                }
                if let Some(complaint) = target {
                    Self::navigate(model, caps, Route::ComplaintDetail(complaint));
                }
            }

            // Complaint registration
            Event::OpenCamera => Self::open_camera(model, caps),
            Event::ShutterPressed => Self::shutter(model, caps),
            Event::CloseCamera => Self::teardown_camera(model, caps),
            Event::RemoveCapture(id) => {
                if model.wizard.remove_capture(id).is_none() {
                    debug!(capture = %id, "no such capture");
                }
            }
            Event::DraftFieldChanged { field, value } => model.wizard.set_field(field, value),
            Event::NextStep => Self::next_step(model, caps),
            Event::PreviousStep => {
                model.wizard.back();
            }
            Event::DetectLocation => Self::detect_location(model, caps),
            Event::ConfirmationDismissed => {
                model.wizard.reset();
                Self::navigate(model, caps, Route::MyComplaints);
            }

            // Capability responses
            Event::SessionLoaded(result) => Self::on_session_loaded(model, caps, *result),
            Event::SessionStored(result) => {
                if let Err(e) = *result {
                    warn!(error = %e, "session not persisted");
                }
            }
            Event::SessionDeleted(result) => {
                if let Err(e) = *result {
                    warn!(error = %e, "stored session not removed");
                }
            }

            Event::LoginResponse(result) | Event::GoogleSignInResponse(result) => {
                Self::sign_in_with(model, caps, *result);
            }
            Event::RegisterResponse(result) => {
                model.auth.submitting = false;
                match Self::auth_response(*result, "Registration failed") {
                    Ok(response) => match Session::from_response(&response) {
                        Some(session) => Self::establish_session(
                            model,
                            caps,
                            session,
                            "Registered successfully",
                        ),
                        None => {
                            model.auth.return_to_login();
                            model.show_toast("Registered successfully", ToastKind::Success);
                        }
                    },
                    Err(e) => Self::report_public(model, &e),
                }
            }
            Event::PasswordResetResponse(result) => {
                Self::on_password_reset_response(model, *result);
            }

            // A response landing after logout belongs to the previous user.
            Event::ProfileFetched(_) if !model.is_authenticated() => {
                model.loading.profile = false;
                debug!("dropping profile for a closed session");
            }
            Event::ProfileFetched(result) => {
                model.loading.profile = false;
                let profile = into_body(*result)
                    .and_then(|body| {
                        api::decode_checked::<ProfileResponse>(&body, "Could not load profile")
                    })
                    .and_then(|response| {
                        response.user_data.ok_or_else(|| {
                            AppError::new(ErrorKind::Deserialization, "Profile missing from response")
                        })
                    });
                match profile {
                    Ok(profile) => model.profile = Some(profile),
                    Err(e) => Self::report(model, caps, &e),
                }
            }
            Event::ProfileSaved(result) => Self::on_profile_saved(model, caps, *result),

            Event::ComplaintsFetched(_) if !model.is_authenticated() => {
                model.loading.complaints = false;
                debug!("dropping complaints for a closed session");
            }
            Event::ComplaintsFetched(result) => {
                model.loading.complaints = false;
                let list = into_body(*result).and_then(|body| {
                    api::decode_checked::<ComplaintListResponse>(&body, "Could not load complaints")
                });
                match list {
                    Ok(list) => {
                        debug!(count = list.complaints.len(), "complaints loaded");
                        model.complaints = list.complaints;
                    }
                    Err(e) => Self::report(model, caps, &e),
                }
            }
            Event::ComplaintDetailFetched { id, result } => {
                Self::on_detail_fetched(model, caps, id, *result);
            }
            Event::NotificationsFetched(result) => {
                model.loading.notifications = false;
                let list = into_body(*result).and_then(|body| {
                    api::decode_checked::<NotificationListResponse>(
                        &body,
                        "Could not load notifications",
                    )
                });
                match list {
                    Ok(list) => model.notifications = list.notifications,
                    Err(e) => Self::report(model, caps, &e),
                }
            }
            Event::NotificationMarked(result) => {
                if let Err(e) = into_body(*result) {
                    warn!(error = %e, "notification not marked read on the server");
                }
            }

            Event::ImagesValidated(result) => Self::on_images_validated(model, caps, *result),
            Event::ComplaintSubmitted { key, result } => {
                Self::on_complaint_submitted(model, caps, &key, *result);
            }
            Event::AddressResolved(result) => Self::on_address_resolved(model, *result),

            Event::CameraOpened(result) => Self::on_camera_opened(model, caps, *result),
            Event::PhotoCaptured(result) => Self::on_photo_captured(model, caps, *result),
            Event::PositionUpdated(result) => Self::on_position_updated(model, caps, *result),
            Event::CurrentPositionReceived(result) => {
                Self::on_current_position(model, caps, *result);
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model, get_current_time_ms())
    }
}
