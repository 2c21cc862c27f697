//! Checkout workflow service
//!
//! Sessions live in memory only. A session moves from the form phase through
//! optional verification and submission to a terminal confirmed phase; closing
//! it (or letting it expire) cancels any in-flight submission and releases its
//! scanner.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        checkout::{
            format_reservation_date, FrameAck, FrameUpload, NavigationLinks, OpenCheckoutRequest,
            OpenCheckoutResponse, RecoveryLinks, ScannerStatus, SessionPhase, SubmitOutcome,
            UpdateIntentRequest,
        },
        CheckoutMode, ConfirmationReceipt, EquipmentUnit, ReturnPolicy, SessionView,
    },
    repository::Repository,
    services::{
        clock::Clock,
        eligibility::{Eligibility, EligibilityService},
        gateway::{ReservationGateway, SubmissionRequest},
        scanner::{Frame, ScanDecoder, ScanVerdict, ScannerHandle},
        settings::SettingsService,
    },
};

pub const CAMERA_DENIED_MESSAGE: &str =
    "Camera access was denied. Allow camera access in your browser settings, then close the scanner and try again.";

enum Scanner {
    Closed,
    Scanning(ScannerHandle),
    PermissionDenied,
}

struct Submission {
    id: Uuid,
    cancel: CancellationToken,
}

/// In-progress checkout or reservation attempt
pub struct CheckoutSession {
    id: Uuid,
    user_id: String,
    equipment: EquipmentUnit,
    mode: CheckoutMode,
    verified: bool,
    return_policy: ReturnPolicy,
    reservation_date: Option<NaiveDate>,
    phase: SessionPhase,
    scanner: Scanner,
    receipt: Option<ConfirmationReceipt>,
    last_error: Option<String>,
    submission: Option<Submission>,
    touched_at: Instant,
}

impl CheckoutSession {
    fn new(user_id: &str, equipment: EquipmentUnit, mode: CheckoutMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            equipment,
            mode,
            verified: false,
            return_policy: ReturnPolicy::default(),
            reservation_date: None,
            phase: SessionPhase::Form,
            scanner: Scanner::Closed,
            receipt: None,
            last_error: None,
            submission: None,
            touched_at: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.touched_at = Instant::now();
    }

    fn ensure_editable(&self) -> AppResult<()> {
        match self.phase {
            SessionPhase::Form | SessionPhase::Verifying => Ok(()),
            SessionPhase::Submitting => Err(AppError::Conflict(
                "A submission is already in progress".to_string(),
            )),
            SessionPhase::Confirmed => Err(AppError::Conflict(format!(
                "Session {} is already confirmed",
                self.id
            ))),
        }
    }

    fn view(&self, now: NaiveDateTime, end_of_shift: NaiveTime) -> SessionView {
        let (scanner, scanner_message) = match self.scanner {
            Scanner::Closed => (ScannerStatus::Closed, None),
            Scanner::Scanning(_) => (ScannerStatus::Scanning, None),
            Scanner::PermissionDenied => (
                ScannerStatus::PermissionDenied,
                Some(CAMERA_DENIED_MESSAGE.to_string()),
            ),
        };

        let (return_policy, estimated_return) = match self.mode {
            CheckoutMode::Checkout => {
                let estimate = match &self.receipt {
                    Some(receipt) => receipt.resolved_time.clone(),
                    None => self.return_policy.estimated_return(now, end_of_shift),
                };
                (Some(self.return_policy), Some(estimate))
            }
            CheckoutMode::Reserve => (None, None),
        };

        SessionView {
            id: self.id,
            equipment_id: self.equipment.id.clone(),
            equipment_type: self.equipment.type_name.clone(),
            mode: self.mode,
            phase: self.phase,
            verified: self.verified,
            scanner,
            scanner_message,
            return_policy,
            reservation_date: self.reservation_date,
            estimated_return,
            submitting: self.phase == SessionPhase::Submitting,
            receipt: self.receipt.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        if let Some(submission) = &self.submission {
            submission.cancel.cancel();
        }
    }
}

type SessionMap = HashMap<Uuid, CheckoutSession>;

fn owned_mut<'a>(
    sessions: &'a mut SessionMap,
    user_id: &str,
    id: Uuid,
) -> AppResult<&'a mut CheckoutSession> {
    sessions
        .get_mut(&id)
        .filter(|s| s.user_id == user_id)
        .ok_or_else(|| AppError::SessionNotFound(format!("Checkout session {} not found", id)))
}

fn ensure_selectable(date: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if date < today {
        return Err(AppError::Validation(format!(
            "Reservation date {} is in the past",
            date
        )));
    }
    Ok(())
}

fn confirmation_number() -> String {
    format!("GSE-{}", rand::thread_rng().gen_range(0..10000))
}

#[derive(Clone)]
pub struct CheckoutService {
    repository: Repository,
    eligibility: EligibilityService,
    gateway: Arc<dyn ReservationGateway>,
    decoder: Arc<dyn ScanDecoder>,
    settings: SettingsService,
    clock: Arc<dyn Clock>,
    config: Arc<AppConfig>,
    end_of_shift: NaiveTime,
    sessions: Arc<RwLock<SessionMap>>,
}

impl CheckoutService {
    pub fn new(
        repository: Repository,
        eligibility: EligibilityService,
        gateway: Arc<dyn ReservationGateway>,
        decoder: Arc<dyn ScanDecoder>,
        settings: SettingsService,
        clock: Arc<dyn Clock>,
        config: Arc<AppConfig>,
    ) -> AppResult<Self> {
        let end_of_shift = NaiveTime::parse_from_str(&config.checkout.end_of_shift, "%H:%M")
            .map_err(|e| {
                AppError::Internal(format!(
                    "Invalid checkout.end_of_shift {:?}: {}",
                    config.checkout.end_of_shift, e
                ))
            })?;

        Ok(Self {
            repository,
            eligibility,
            gateway,
            decoder,
            settings,
            clock,
            config,
            end_of_shift,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn view(&self, session: &CheckoutSession) -> SessionView {
        session.view(self.clock.now(), self.end_of_shift)
    }

    /// Open checkout for a unit. Ineligible users get the terminal
    /// "certification required" view and no session is created.
    pub async fn open(
        &self,
        user_id: &str,
        request: OpenCheckoutRequest,
    ) -> AppResult<OpenCheckoutResponse> {
        let unit = self
            .repository
            .equipment_get_by_id(&request.equipment_id)
            .await?;

        match self.eligibility.check(user_id, &unit, request.mode).await? {
            Eligibility::Eligible => {}
            Eligibility::CertificationRequired { required } => {
                tracing::info!(
                    "User {} lacks certification {:?} for {}",
                    user_id,
                    required.as_str(),
                    unit.id
                );
                return Ok(OpenCheckoutResponse::CertificationRequired {
                    equipment_id: unit.id,
                    equipment_type: unit.type_name,
                    required_certification: required,
                    links: RecoveryLinks::default(),
                });
            }
            Eligibility::Unavailable { status } => {
                tracing::info!("Unit {} is {}, {:?} refused", unit.id, status, request.mode);
                return Ok(OpenCheckoutResponse::Unavailable {
                    equipment_id: unit.id,
                    status,
                    links: RecoveryLinks::default(),
                });
            }
        }

        let session = CheckoutSession::new(user_id, unit, request.mode);
        let view = self.view(&session);
        tracing::info!(
            "Opened {:?} session {} for user {} on {}",
            session.mode,
            session.id,
            user_id,
            session.equipment.id
        );
        self.sessions.write().await.insert(session.id, session);

        Ok(OpenCheckoutResponse::Session { session: view })
    }

    pub async fn get(&self, user_id: &str, id: Uuid) -> AppResult<SessionView> {
        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();
        Ok(self.view(session))
    }

    /// Navigate away: the session and everything it owns is torn down
    pub async fn close(&self, user_id: &str, id: Uuid) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        owned_mut(&mut sessions, user_id, id)?;
        sessions.remove(&id);
        tracing::info!("Closed checkout session {}", id);
        Ok(())
    }

    pub async fn update_intent(
        &self,
        user_id: &str,
        id: Uuid,
        request: UpdateIntentRequest,
    ) -> AppResult<SessionView> {
        let today = self.clock.now().date();
        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();
        session.ensure_editable()?;

        match session.mode {
            CheckoutMode::Checkout => {
                if request.reservation_date.is_some() {
                    return Err(AppError::BadRequest(
                        "A reservation date only applies to reservations".to_string(),
                    ));
                }
                let policy = request.return_policy.ok_or_else(|| {
                    AppError::BadRequest("return_policy is required for checkout".to_string())
                })?;
                policy.validate()?;
                session.return_policy = policy;
            }
            CheckoutMode::Reserve => {
                if request.return_policy.is_some() {
                    return Err(AppError::BadRequest(
                        "A return policy only applies to checkouts".to_string(),
                    ));
                }
                let date = request.reservation_date.ok_or_else(|| {
                    AppError::BadRequest("reservation_date is required for reservations".to_string())
                })?;
                ensure_selectable(date, today)?;
                session.reservation_date = Some(date);
            }
        }

        session.last_error = None;
        Ok(self.view(session))
    }

    fn open_scanner(&self, session: &mut CheckoutSession) {
        if matches!(session.scanner, Scanner::Scanning(_)) {
            return;
        }

        let service = self.clone();
        let session_id = session.id;
        let handle = ScannerHandle::open(&self.config.scan, self.decoder.clone(), move |payload| {
            let service = service.clone();
            async move { service.apply_scan_payload(session_id, &payload).await }
        });

        session.scanner = Scanner::Scanning(handle);
        session.phase = SessionPhase::Verifying;
        tracing::info!("Scanner opened for session {}", session.id);
    }

    /// Called by the sampling loop for every decoded payload
    async fn apply_scan_payload(&self, session_id: Uuid, payload: &str) -> ScanVerdict {
        let strict = self.settings.strict_scan_match().await;
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(session) if matches!(session.scanner, Scanner::Scanning(_)) => {
                record_scan(session, payload, strict)
            }
            // Session or scanner already gone: stop sampling
            _ => ScanVerdict::Accepted,
        }
    }

    /// Open the scanner (checkout mode only)
    pub async fn request_scan(&self, user_id: &str, id: Uuid) -> AppResult<SessionView> {
        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();
        session.ensure_editable()?;

        if session.mode == CheckoutMode::Reserve {
            return Err(AppError::BadRequest(
                "Reservations do not require verification".to_string(),
            ));
        }
        if !session.verified {
            self.open_scanner(session);
        }
        Ok(self.view(session))
    }

    pub async fn push_frame(&self, user_id: &str, id: Uuid, upload: FrameUpload) -> AppResult<FrameAck> {
        upload.validate()?;
        let frame = Frame::from_upload(&upload)?;

        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();

        match &session.scanner {
            Scanner::Scanning(handle) => Ok(handle.push_frame(frame)),
            Scanner::PermissionDenied => Err(AppError::Conflict(
                "Camera access was denied; close the scanner to continue".to_string(),
            )),
            Scanner::Closed => Err(AppError::Conflict("Scanner is not open".to_string())),
        }
    }

    /// A payload decoded on the client
    pub async fn scan_result(&self, user_id: &str, id: Uuid, payload: &str) -> AppResult<SessionView> {
        let strict = self.settings.strict_scan_match().await;
        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();
        session.ensure_editable()?;

        match session.scanner {
            Scanner::Scanning(_) => {}
            Scanner::PermissionDenied => {
                return Err(AppError::Conflict(
                    "Camera access was denied; close the scanner to continue".to_string(),
                ))
            }
            Scanner::Closed => return Err(AppError::Conflict("Scanner is not open".to_string())),
        }

        record_scan(session, payload, strict);
        Ok(self.view(session))
    }

    /// Camera permission denied: terminal for this scanner, no retry
    pub async fn camera_denied(&self, user_id: &str, id: Uuid) -> AppResult<SessionView> {
        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();

        match session.scanner {
            Scanner::Scanning(_) => {
                session.scanner = Scanner::PermissionDenied;
                tracing::warn!("Camera access denied for session {}", session.id);
            }
            Scanner::PermissionDenied => {}
            Scanner::Closed => return Err(AppError::Conflict("Scanner is not open".to_string())),
        }
        Ok(self.view(session))
    }

    pub async fn close_scanner(&self, user_id: &str, id: Uuid) -> AppResult<SessionView> {
        let mut sessions = self.sessions.write().await;
        let session = owned_mut(&mut sessions, user_id, id)?;
        session.touch();

        session.scanner = Scanner::Closed;
        if session.phase == SessionPhase::Verifying {
            session.phase = SessionPhase::Form;
        }
        Ok(self.view(session))
    }

    /// Submit the session. An unverified checkout opens the scanner instead
    /// and must be submitted again once verified.
    pub async fn submit(&self, user_id: &str, id: Uuid) -> AppResult<SubmitOutcome> {
        let now = self.clock.now();

        let (request, submission_id, cancel) = {
            let mut sessions = self.sessions.write().await;
            let session = owned_mut(&mut sessions, user_id, id)?;
            session.touch();
            session.ensure_editable()?;

            if session.mode == CheckoutMode::Checkout && !session.verified {
                self.open_scanner(session);
                tracing::info!("Session {} must be verified before checkout", id);
                return Ok(SubmitOutcome::VerificationRequired {
                    session: self.view(session),
                });
            }

            let (estimated_return, reservation_date) = match session.mode {
                CheckoutMode::Checkout => (
                    Some(session.return_policy.estimated_return(now, self.end_of_shift)),
                    None,
                ),
                CheckoutMode::Reserve => {
                    let date = session.reservation_date.ok_or_else(|| {
                        AppError::Validation("Select a reservation date first".to_string())
                    })?;
                    ensure_selectable(date, now.date())?;
                    (None, Some(date))
                }
            };

            let request = SubmissionRequest {
                session_id: session.id,
                user_id: user_id.to_string(),
                equipment_id: session.equipment.id.clone(),
                mode: session.mode,
                return_policy: (session.mode == CheckoutMode::Checkout)
                    .then_some(session.return_policy),
                reservation_date,
                estimated_return,
            };

            let submission = Submission {
                id: Uuid::new_v4(),
                cancel: CancellationToken::new(),
            };
            let handles = (submission.id, submission.cancel.clone());
            session.submission = Some(submission);
            session.phase = SessionPhase::Submitting;
            session.last_error = None;
            (request, handles.0, handles.1)
        };

        tracing::info!(
            "Submitting {:?} of {} for user {} (session {})",
            request.mode,
            request.equipment_id,
            user_id,
            id
        );

        let result = tokio::select! {
            result = self.gateway.submit(&request) => result,
            _ = cancel.cancelled() => {
                tracing::info!("Submission for session {} cancelled", id);
                return Err(AppError::SessionNotFound(format!("Checkout session {} was closed", id)));
            }
        };

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .filter(|s| s.submission.as_ref().map(|sub| sub.id) == Some(submission_id))
            .ok_or_else(|| {
                AppError::SessionNotFound(format!("Checkout session {} was closed", id))
            })?;
        session.submission = None;

        match result {
            Ok(ack) => {
                let resolved_time = match (&request.estimated_return, request.reservation_date) {
                    (Some(estimate), _) => estimate.clone(),
                    (None, Some(date)) => format_reservation_date(date),
                    (None, None) => String::new(),
                };
                let receipt = ConfirmationReceipt {
                    confirmation_number: confirmation_number(),
                    mode: session.mode,
                    equipment_id: session.equipment.id.clone(),
                    equipment_type: session.equipment.type_name.clone(),
                    resolved_time,
                    links: NavigationLinks::default(),
                };
                session.receipt = Some(receipt.clone());
                session.phase = SessionPhase::Confirmed;
                tracing::info!(
                    "Session {} confirmed as {} (backend reference {:?})",
                    id,
                    receipt.confirmation_number,
                    ack.reference
                );
                Ok(SubmitOutcome::Confirmed {
                    receipt,
                    session: self.view(session),
                })
            }
            Err(e) => {
                let message = match e {
                    AppError::Upstream(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!("Submission for session {} failed: {}", id, message);
                session.phase = SessionPhase::Form;
                session.last_error = Some(format!("Submission failed: {}", message));
                Err(AppError::Upstream(message))
            }
        }
    }

    /// Receipts of the user's confirmed checkouts still held in memory
    pub async fn confirmed_checkouts(&self, user_id: &str) -> Vec<ConfirmationReceipt> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.mode == CheckoutMode::Checkout)
            .filter_map(|s| s.receipt.clone())
            .collect()
    }

    /// Drop sessions idle for longer than the configured TTL
    pub async fn sweep_expired(&self) -> usize {
        let ttl = Duration::from_secs(self.config.checkout.session_ttl_minutes.saturating_mul(60));
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.touched_at.elapsed() < ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Expired {} idle checkout sessions", removed);
        }
        removed
    }

    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let service = self.clone();
        let period = Duration::from_secs(self.config.checkout.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        service.sweep_expired().await;
                    }
                }
            }
        })
    }

    /// Tear down every session (process shutdown)
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        tracing::info!("Closed {} checkout sessions on shutdown", count);
    }
}

/// Apply a decoded payload to a session with an open scanner. A mismatch is
/// logged; it only blocks verification in strict mode.
fn record_scan(session: &mut CheckoutSession, payload: &str, strict: bool) -> ScanVerdict {
    if payload.trim() != session.equipment.id {
        tracing::warn!(
            "Scanned code {:?} does not match unit {} (session {})",
            payload,
            session.equipment.id,
            session.id
        );
        if strict {
            session.last_error = Some(format!(
                "Scanned code does not match {}",
                session.equipment.id
            ));
            return ScanVerdict::Rejected;
        }
    }

    session.verified = true;
    session.scanner = Scanner::Closed;
    session.phase = SessionPhase::Form;
    session.last_error = None;
    tracing::info!("Session {} verified", session.id);
    ScanVerdict::Accepted
}
