//! Settings endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::settings::{PortalSettings, UpdateSettingsRequest},
};

use super::AuthenticatedUser;

/// Get current portal settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current settings", body = PortalSettings)
    )
)]
pub async fn get_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<PortalSettings>> {
    Ok(Json(state.services.settings.get().await))
}

/// Update portal settings (feature flags are merged, administrators only)
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = PortalSettings),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> AppResult<Json<PortalSettings>> {
    claims.require_admin()?;
    tracing::info!("User {} updating portal settings", claims.user_id);
    let settings = state.services.settings.update(request).await?;
    Ok(Json(settings))
}
