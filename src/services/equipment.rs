//! Equipment service

use crate::{
    error::AppResult,
    models::{equipment::EquipmentDetails, CheckoutMode, EquipmentQuery, EquipmentUnit, UserCertification},
    repository::Repository,
    services::{
        eligibility::{Eligibility, EligibilityService},
        search,
    },
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    eligibility: EligibilityService,
}

impl EquipmentService {
    pub fn new(repository: Repository, eligibility: EligibilityService) -> Self {
        Self {
            repository,
            eligibility,
        }
    }

    /// Filtered candidate list, nearest first
    pub async fn search(&self, query: &EquipmentQuery) -> AppResult<Vec<EquipmentUnit>> {
        let units = self.repository.equipment_list().await?;
        let result = search::filter(&units, query);
        tracing::debug!(
            "Search {:?} matched {} of {} units",
            query,
            result.len(),
            units.len()
        );
        Ok(result)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<EquipmentDetails> {
        let unit = self.repository.equipment_get_by_id(id).await?;
        Ok(unit.into())
    }

    /// Gate decision for the current user on one unit
    pub async fn eligibility(
        &self,
        user_id: &str,
        id: &str,
        mode: CheckoutMode,
    ) -> AppResult<Eligibility> {
        let unit = self.repository.equipment_get_by_id(id).await?;
        self.eligibility.check(user_id, &unit, mode).await
    }

    pub async fn certifications(&self, user_id: &str) -> AppResult<Vec<UserCertification>> {
        self.eligibility.certifications(user_id).await
    }
}
