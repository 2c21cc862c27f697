//! Eligibility gate: may the current user operate a given unit?

use std::{collections::HashSet, sync::Arc};

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        CertificationName, CheckoutMode, EquipmentStatus, EquipmentUnit, UserCertification,
    },
    repository::Repository,
    services::clock::Clock,
};

/// Requirement labels that every user satisfies
fn requirement_is_waived(required: &str) -> bool {
    let required = required.trim();
    required.is_empty() || required.eq_ignore_ascii_case("none")
}

/// Exact-label membership of `required` in the held certification names.
/// Expiry is not consulted here.
pub fn may_operate(required: &str, held: &HashSet<CertificationName>) -> bool {
    if requirement_is_waived(required) {
        return true;
    }
    held.iter().any(|name| name.as_str() == required)
}

/// Names of the certifications that count toward eligibility
pub fn held_names(
    certifications: &[UserCertification],
    enforce_expiry: bool,
    today: NaiveDate,
) -> HashSet<CertificationName> {
    certifications
        .iter()
        .filter(|c| !enforce_expiry || c.is_current(today))
        .map(|c| c.name.clone())
        .collect()
}

/// Gate decision for one unit and mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    CertificationRequired { required: CertificationName },
    Unavailable { status: EquipmentStatus },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Combine the status rule with the certification predicate.
/// Checkout needs an available unit; a reservation may target a unit in use.
pub fn evaluate(
    unit: &EquipmentUnit,
    held: &HashSet<CertificationName>,
    mode: CheckoutMode,
) -> Eligibility {
    let status_ok = match (mode, unit.status) {
        (_, EquipmentStatus::Available) => true,
        (CheckoutMode::Reserve, EquipmentStatus::InUse) => true,
        _ => false,
    };

    if !status_ok {
        return Eligibility::Unavailable {
            status: unit.status,
        };
    }

    if may_operate(&unit.certification_required, held) {
        Eligibility::Eligible
    } else {
        Eligibility::CertificationRequired {
            required: CertificationName(unit.certification_required.clone()),
        }
    }
}

/// Looks up the current user's certifications and applies the gate
#[derive(Clone)]
pub struct EligibilityService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    enforce_expiry: bool,
}

impl EligibilityService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, enforce_expiry: bool) -> Self {
        Self {
            repository,
            clock,
            enforce_expiry,
        }
    }

    pub async fn certifications(&self, user_id: &str) -> AppResult<Vec<UserCertification>> {
        self.repository.certifications_for_user(user_id).await
    }

    pub async fn check(
        &self,
        user_id: &str,
        unit: &EquipmentUnit,
        mode: CheckoutMode,
    ) -> AppResult<Eligibility> {
        let certifications = self.certifications(user_id).await?;
        let held = held_names(&certifications, self.enforce_expiry, self.clock.now().date());
        let decision = evaluate(unit, &held, mode);

        tracing::debug!(
            "Eligibility for user {} on {} ({:?}): {:?}",
            user_id,
            unit.id,
            mode,
            decision
        );

        Ok(decision)
    }
}
