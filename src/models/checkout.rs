//! Checkout / reservation session models

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::certification::CertificationName;
use super::equipment::EquipmentStatus;

pub const MIN_DURATION_HOURS: u8 = 1;
pub const MAX_DURATION_HOURS: u8 = 12;
pub const DEFAULT_DURATION_HOURS: u8 = 4;

pub const SEARCH_ROUTE: &str = "/equipment/search";
pub const MY_EQUIPMENT_ROUTE: &str = "/me/equipment";
pub const PROFILE_ROUTE: &str = "/me/certifications";

/// Immediate checkout or future reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    Checkout,
    Reserve,
}

fn default_specific_time() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()
}

fn default_duration_hours() -> u8 {
    DEFAULT_DURATION_HOURS
}

/// When a checked-out unit is expected back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ReturnPolicy {
    #[default]
    EndOfShift,
    SpecificTime {
        #[serde(default = "default_specific_time")]
        #[schema(value_type = String, example = "18:00:00")]
        time: NaiveTime,
    },
    Duration {
        #[serde(default = "default_duration_hours")]
        hours: u8,
    },
}

impl ReturnPolicy {
    pub fn validate(&self) -> AppResult<()> {
        if let ReturnPolicy::Duration { hours } = self {
            if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(hours) {
                return Err(AppError::Validation(format!(
                    "Duration must be between {} and {} hours",
                    MIN_DURATION_HOURS, MAX_DURATION_HOURS
                )));
            }
        }
        Ok(())
    }

    /// Resolve the policy against the current time
    pub fn return_at(&self, now: NaiveDateTime, end_of_shift: NaiveTime) -> NaiveDateTime {
        match self {
            ReturnPolicy::EndOfShift => now.date().and_time(end_of_shift),
            ReturnPolicy::SpecificTime { time } => now.date().and_time(*time),
            ReturnPolicy::Duration { hours } => now + Duration::hours(i64::from(*hours)),
        }
    }

    /// Estimated return time as a 12-hour clock string
    pub fn estimated_return(&self, now: NaiveDateTime, end_of_shift: NaiveTime) -> String {
        format_clock(self.return_at(now, end_of_shift).time())
    }
}

/// Format a time of day as "4:30 PM"
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

pub fn format_reservation_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Where the workflow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Form,
    Verifying,
    Submitting,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScannerStatus {
    Closed,
    Scanning,
    PermissionDenied,
}

/// Post-confirmation navigation targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NavigationLinks {
    pub search: String,
    pub my_equipment: String,
}

impl Default for NavigationLinks {
    fn default() -> Self {
        Self {
            search: SEARCH_ROUTE.to_string(),
            my_equipment: MY_EQUIPMENT_ROUTE.to_string(),
        }
    }
}

/// Recovery targets offered with the "certification required" view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecoveryLinks {
    pub search: String,
    pub profile: String,
}

impl Default for RecoveryLinks {
    fn default() -> Self {
        Self {
            search: SEARCH_ROUTE.to_string(),
            profile: PROFILE_ROUTE.to_string(),
        }
    }
}

/// Display-only summary of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationReceipt {
    /// "GSE-" followed by a number below 10000; decorative, not unique
    pub confirmation_number: String,
    pub mode: CheckoutMode,
    pub equipment_id: String,
    pub equipment_type: String,
    /// Estimated return time (checkout) or reservation date (reserve)
    pub resolved_time: String,
    pub links: NavigationLinks,
}

/// Client view of a checkout session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub equipment_id: String,
    pub equipment_type: String,
    pub mode: CheckoutMode,
    pub phase: SessionPhase,
    pub verified: bool,
    pub scanner: ScannerStatus,
    /// Message shown by the scanner surface (e.g. camera access denied)
    pub scanner_message: Option<String>,
    pub return_policy: Option<ReturnPolicy>,
    #[schema(value_type = Option<String>, example = "2026-10-20")]
    pub reservation_date: Option<NaiveDate>,
    pub estimated_return: Option<String>,
    pub submitting: bool,
    pub receipt: Option<ConfirmationReceipt>,
    pub last_error: Option<String>,
}

/// Open checkout request
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenCheckoutRequest {
    pub equipment_id: String,
    pub mode: CheckoutMode,
}

/// Outcome of opening checkout for a unit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum OpenCheckoutResponse {
    Session {
        session: SessionView,
    },
    CertificationRequired {
        equipment_id: String,
        equipment_type: String,
        required_certification: CertificationName,
        links: RecoveryLinks,
    },
    Unavailable {
        equipment_id: String,
        status: EquipmentStatus,
        links: RecoveryLinks,
    },
}

/// Form / intent capture update
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateIntentRequest {
    /// Checkout mode only
    pub return_policy: Option<ReturnPolicy>,
    /// Reserve mode only (YYYY-MM-DD)
    #[schema(value_type = Option<String>, example = "2026-10-20")]
    pub reservation_date: Option<NaiveDate>,
}

/// Outcome of a submit attempt
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Checkout is blocked until the unit's code has been scanned
    VerificationRequired { session: SessionView },
    Confirmed {
        receipt: ConfirmationReceipt,
        session: SessionView,
    },
}

/// A camera frame pushed to the scanner
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FrameUpload {
    #[validate(range(min = 1, max = 4096))]
    pub width: u32,
    #[validate(range(min = 1, max = 4096))]
    pub height: u32,
    /// Base64 pixel data, greyscale (1 byte/pixel) or RGBA (4 bytes/pixel)
    pub pixels: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FrameAck {
    Queued,
    /// The scanner was busy; the frame was discarded
    Dropped,
}

/// Payload decoded on the client
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanResultRequest {
    pub payload: String,
}
