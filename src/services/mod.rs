//! Business logic services

pub mod checkout;
pub mod clock;
pub mod eligibility;
pub mod equipment;
pub mod gateway;
pub mod scanner;
pub mod search;
pub mod settings;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub checkout: checkout::CheckoutService,
    pub settings: settings::SettingsService,
}

impl Services {
    /// Create all services on top of the given repository and collaborators
    pub fn new(
        config: Arc<AppConfig>,
        repository: Repository,
        gateway: Arc<dyn gateway::ReservationGateway>,
        decoder: Arc<dyn scanner::ScanDecoder>,
        settings: settings::SettingsService,
        clock: Arc<dyn clock::Clock>,
    ) -> AppResult<Self> {
        let eligibility = eligibility::EligibilityService::new(
            repository.clone(),
            clock.clone(),
            config.checkout.enforce_certification_expiry,
        );

        Ok(Self {
            equipment: equipment::EquipmentService::new(repository.clone(), eligibility.clone()),
            checkout: checkout::CheckoutService::new(
                repository,
                eligibility,
                gateway,
                decoder,
                settings.clone(),
                clock,
                config,
            )?,
            settings,
        })
    }
}
