//! Equipment model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

static DISTANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").expect("valid distance pattern"));

/// Operational status as reported by the fleet API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EquipmentStatus {
    Available,
    #[serde(rename = "In Use")]
    InUse,
    Maintenance,
    /// Any status string this server does not know about
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Available => "Available",
            EquipmentStatus::InUse => "In Use",
            EquipmentStatus::Maintenance => "Maintenance",
            EquipmentStatus::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentCategory {
    #[serde(alias = "Powered")]
    Powered,
    #[serde(alias = "Non-Powered", alias = "non_powered")]
    NonPowered,
}

/// Display-only grouping derived from category and power type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EquipmentClass {
    A,
    B,
    C,
}

/// A physical ground-service asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentUnit {
    /// Stable unit identifier (e.g. "BTG-1045")
    pub id: String,
    /// Type name (e.g. "Baggage Tractor")
    #[serde(rename = "type")]
    pub type_name: String,
    pub category: EquipmentCategory,
    /// Short equipment code (e.g. "BTG")
    pub code: String,
    pub power_type: String,
    /// Aircraft compatibility tag (e.g. "A320/B737", "All")
    pub aircraft: String,
    pub status: EquipmentStatus,
    /// Label of the certification required to operate the unit
    pub certification_required: String,
    /// Distance from terminal, display string (e.g. "0.3 mi")
    pub distance: String,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_maintenance: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_maintenance: Option<DateTime<Utc>>,
}

impl EquipmentUnit {
    pub fn class(&self) -> EquipmentClass {
        match self.category {
            EquipmentCategory::NonPowered => EquipmentClass::C,
            EquipmentCategory::Powered if self.power_type.eq_ignore_ascii_case("electric") => {
                EquipmentClass::B
            }
            EquipmentCategory::Powered => EquipmentClass::A,
        }
    }

    /// Leading number of the distance string, if any
    pub fn distance_value(&self) -> Option<f64> {
        DISTANCE_RE
            .captures(&self.distance)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Unit details with derived display fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EquipmentDetails {
    #[serde(flatten)]
    pub unit: EquipmentUnit,
    pub class: EquipmentClass,
}

impl From<EquipmentUnit> for EquipmentDetails {
    fn from(unit: EquipmentUnit) -> Self {
        let class = unit.class();
        Self { unit, class }
    }
}

fn default_filter_token() -> String {
    "all".to_string()
}

/// Search & filter parameters
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Case-insensitive substring of unit id or type name
    pub query: Option<String>,
    /// UI equipment category (e.g. "baggage-tractor") or "all"
    #[serde(default = "default_filter_token")]
    pub type_filter: String,
    /// Aircraft family (e.g. "narrow-body") or "all"
    #[serde(default = "default_filter_token")]
    pub aircraft_filter: String,
    /// Also list units currently in use
    #[serde(default)]
    pub include_in_use: bool,
}

impl EquipmentQuery {
    pub fn all() -> Self {
        Self {
            query: None,
            type_filter: default_filter_token(),
            aircraft_filter: default_filter_token(),
            include_in_use: false,
        }
    }
}
