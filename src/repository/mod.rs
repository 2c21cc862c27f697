//! Repository layer over the fleet data sources

pub mod fixtures;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::{AppConfig, SourceKind},
    error::AppResult,
    models::{EquipmentUnit, UserCertification},
};

/// Read-only access to equipment and certification records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FleetSource: Send + Sync {
    /// Full equipment collection
    async fn list_equipment(&self) -> AppResult<Vec<EquipmentUnit>>;

    /// Single unit by id, `NotFound` when unknown
    async fn get_equipment(&self, id: &str) -> AppResult<EquipmentUnit>;

    /// Certifications held by a user (empty when the user holds none)
    async fn user_certifications(&self, user_id: &str) -> AppResult<Vec<UserCertification>>;
}

/// Main repository struct holding the configured fleet source
#[derive(Clone)]
pub struct Repository {
    source: Arc<dyn FleetSource>,
}

impl Repository {
    pub fn new(source: Arc<dyn FleetSource>) -> Self {
        Self { source }
    }

    /// Build the source selected by `source.kind`
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let source: Arc<dyn FleetSource> = match config.source.kind {
            SourceKind::Fixtures => Arc::new(fixtures::FixtureFleetSource::load(&config.fixtures)?),
            SourceKind::Http => Arc::new(http::HttpFleetSource::new(&config.source)?),
        };
        Ok(Self::new(source))
    }

    pub async fn equipment_list(&self) -> AppResult<Vec<EquipmentUnit>> {
        self.source.list_equipment().await
    }

    pub async fn equipment_get_by_id(&self, id: &str) -> AppResult<EquipmentUnit> {
        self.source.get_equipment(id).await
    }

    pub async fn certifications_for_user(&self, user_id: &str) -> AppResult<Vec<UserCertification>> {
        self.source.user_certifications(user_id).await
    }
}
