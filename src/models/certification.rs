//! Operator certification model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Certification label, compared by exact equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CertificationName(pub String);

impl CertificationName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CertificationName {
    fn from(s: &str) -> Self {
        CertificationName(s.to_string())
    }
}

impl std::fmt::Display for CertificationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CertificationStatus {
    Active,
    Expired,
}

/// A credential held by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCertification {
    pub name: CertificationName,
    pub expiry_date: NaiveDate,
    pub status: CertificationStatus,
}

impl UserCertification {
    /// Active and not expired on `today`
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.status == CertificationStatus::Active && self.expiry_date >= today
    }
}
