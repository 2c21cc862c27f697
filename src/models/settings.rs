//! Portal-wide feature flags and theme

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Process-wide portal settings, loaded at startup and saved at shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PortalSettings {
    pub theme: Theme,
    /// UI feature flags, opaque to the checkout workflow
    pub feature_flags: BTreeMap<String, bool>,
    /// Reject scanned codes that do not match the target unit id
    pub strict_scan_match: bool,
}

impl Default for PortalSettings {
    fn default() -> Self {
        let feature_flags = [
            ("equipment_reservations", true),
            ("maintenance_scheduling", true),
            ("personnel_tracking", true),
            ("fleet_analytics", false),
        ]
        .into_iter()
        .map(|(name, on)| (name.to_string(), on))
        .collect();

        Self {
            theme: Theme::default(),
            feature_flags,
            strict_scan_match: false,
        }
    }
}

/// Partial settings update; flags are merged into the existing set
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub theme: Option<Theme>,
    pub feature_flags: Option<BTreeMap<String, bool>>,
    pub strict_scan_match: Option<bool>,
}

impl PortalSettings {
    pub fn apply(&mut self, update: UpdateSettingsRequest) {
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(flags) = update.feature_flags {
            self.feature_flags.extend(flags);
        }
        if let Some(strict) = update.strict_scan_match {
            self.strict_scan_match = strict;
        }
    }
}
