//! Equipment search & filter

use crate::models::{EquipmentQuery, EquipmentStatus, EquipmentUnit};

pub const ALL: &str = "all";

/// How a UI category token matches an equipment code
#[derive(Debug, Clone, Copy)]
enum CodeMatch {
    Prefix(&'static str),
    Exact(&'static str),
}

impl CodeMatch {
    fn matches(self, code: &str) -> bool {
        match self {
            CodeMatch::Prefix(prefix) => code.starts_with(prefix),
            CodeMatch::Exact(exact) => code == exact,
        }
    }
}

const TYPE_FILTERS: &[(&str, &[CodeMatch])] = &[
    ("baggage-tractor", &[CodeMatch::Prefix("BTG"), CodeMatch::Exact("TUG")]),
    ("belt-loader", &[CodeMatch::Prefix("BLT"), CodeMatch::Exact("BL")]),
    ("ground-power", &[CodeMatch::Prefix("GPU")]),
    ("towbar", &[CodeMatch::Prefix("TB")]),
    ("pushback", &[CodeMatch::Prefix("PBT"), CodeMatch::Exact("PB")]),
    ("air-start", &[CodeMatch::Prefix("ASU")]),
    ("air-conditioning", &[CodeMatch::Prefix("PCA"), CodeMatch::Prefix("ACU")]),
    ("cargo-loader", &[CodeMatch::Prefix("LDL"), CodeMatch::Exact("CL")]),
    ("baggage-cart", &[CodeMatch::Prefix("BGC"), CodeMatch::Exact("CART")]),
    ("lavatory-service", &[CodeMatch::Prefix("LAV")]),
    ("potable-water", &[CodeMatch::Prefix("PWT")]),
    ("deicer", &[CodeMatch::Prefix("DIC")]),
];

// Filter tokens compare case-insensitively, like "all".
// "All" is the tag carried by units compatible with every aircraft
const AIRCRAFT_FILTERS: &[(&str, &[&str])] = &[
    ("narrow-body", &["A319", "A320", "A321", "B737", "B757", "All"]),
    ("wide-body", &["A330", "A350", "A380", "B747", "B767", "B777", "B787", "All"]),
    ("regional", &["CRJ", "ERJ", "E175", "E190", "Q400", "ATR", "All"]),
];

fn status_visible(unit: &EquipmentUnit, include_in_use: bool) -> bool {
    match unit.status {
        EquipmentStatus::Available => true,
        EquipmentStatus::InUse => include_in_use,
        _ => false,
    }
}

fn matches_text(unit: &EquipmentUnit, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => {
            unit.id.to_lowercase().contains(needle)
                || unit.type_name.to_lowercase().contains(needle)
        }
    }
}

fn matches_type(unit: &EquipmentUnit, token: &str) -> bool {
    if token.eq_ignore_ascii_case(ALL) {
        return true;
    }
    let code = unit.code.to_uppercase();
    TYPE_FILTERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, codes)| codes.iter().any(|m| m.matches(&code)))
        .unwrap_or(false)
}

fn matches_aircraft(unit: &EquipmentUnit, token: &str) -> bool {
    if token.eq_ignore_ascii_case(ALL) {
        return true;
    }
    AIRCRAFT_FILTERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, families)| families.iter().any(|f| unit.aircraft.contains(f)))
        .unwrap_or(false)
}

fn distance_key(unit: &EquipmentUnit) -> f64 {
    unit.distance_value().unwrap_or(f64::INFINITY)
}

/// Candidate units for the given query, nearest first.
/// All predicates must hold; the sort is stable.
pub fn filter(units: &[EquipmentUnit], query: &EquipmentQuery) -> Vec<EquipmentUnit> {
    let needle = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut result: Vec<EquipmentUnit> = units
        .iter()
        .filter(|u| status_visible(u, query.include_in_use))
        .filter(|u| matches_text(u, needle.as_deref()))
        .filter(|u| matches_type(u, &query.type_filter))
        .filter(|u| matches_aircraft(u, &query.aircraft_filter))
        .cloned()
        .collect();

    result.sort_by(|a, b| distance_key(a).total_cmp(&distance_key(b)));
    result
}
