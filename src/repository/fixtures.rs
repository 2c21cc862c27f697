//! JSON fixture source

use std::{collections::HashMap, fs, path::Path};

use async_trait::async_trait;

use super::FleetSource;
use crate::{
    config::FixturesConfig,
    error::{AppError, AppResult},
    models::{EquipmentUnit, UserCertification},
};

/// In-memory records loaded once from fixture files
#[derive(Debug, Clone, Default)]
pub struct FixtureFleetSource {
    equipment: Vec<EquipmentUnit>,
    certifications: HashMap<String, Vec<UserCertification>>,
}

impl FixtureFleetSource {
    pub fn from_records(
        equipment: Vec<EquipmentUnit>,
        certifications: HashMap<String, Vec<UserCertification>>,
    ) -> Self {
        Self {
            equipment,
            certifications,
        }
    }

    /// Load equipment (JSON array) and certifications (JSON object keyed by user id)
    pub fn load(config: &FixturesConfig) -> AppResult<Self> {
        let equipment: Vec<EquipmentUnit> = read_json(Path::new(&config.equipment_path))?;
        let certifications: HashMap<String, Vec<UserCertification>> =
            read_json(Path::new(&config.certifications_path))?;

        tracing::info!(
            "Loaded {} equipment units and certifications for {} users from fixtures",
            equipment.len(),
            certifications.len()
        );

        Ok(Self::from_records(equipment, certifications))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> AppResult<T> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Invalid fixture {}: {}", path.display(), e)))
}

#[async_trait]
impl FleetSource for FixtureFleetSource {
    async fn list_equipment(&self) -> AppResult<Vec<EquipmentUnit>> {
        Ok(self.equipment.clone())
    }

    async fn get_equipment(&self, id: &str) -> AppResult<EquipmentUnit> {
        self.equipment
            .iter()
            .find(|unit| unit.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn user_certifications(&self, user_id: &str) -> AppResult<Vec<UserCertification>> {
        Ok(self.certifications.get(user_id).cloned().unwrap_or_default())
    }
}
