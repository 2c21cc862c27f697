//! Portal settings service (feature flags and theme)

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::settings::{PortalSettings, UpdateSettingsRequest},
};

/// Holds the one settings object for the process. Loaded explicitly at
/// startup and saved explicitly on update and at shutdown.
#[derive(Clone)]
pub struct SettingsService {
    path: PathBuf,
    current: Arc<RwLock<PortalSettings>>,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>, settings: PortalSettings) -> Self {
        Self {
            path: path.into(),
            current: Arc::new(RwLock::new(settings)),
        }
    }

    /// Read settings from `path`, falling back to defaults when the file does not exist
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let settings = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Internal(format!("Invalid settings file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings file at {}, using defaults", path.display());
                PortalSettings::default()
            }
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to read settings {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(Self::new(path, settings))
    }

    pub async fn get(&self) -> PortalSettings {
        self.current.read().await.clone()
    }

    pub async fn strict_scan_match(&self) -> bool {
        self.current.read().await.strict_scan_match
    }

    /// Apply a partial update and persist it
    pub async fn update(&self, request: UpdateSettingsRequest) -> AppResult<PortalSettings> {
        let updated = {
            let mut current = self.current.write().await;
            current.apply(request);
            current.clone()
        };
        self.write(&updated).await?;
        tracing::info!("Portal settings updated");
        Ok(updated)
    }

    pub async fn save(&self) -> AppResult<()> {
        let settings = self.get().await;
        self.write(&settings).await
    }

    async fn write(&self, settings: &PortalSettings) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Internal(format!("Failed to serialize settings: {}", e)))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            AppError::Internal(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
