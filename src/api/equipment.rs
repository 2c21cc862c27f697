//! Equipment API endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{equipment::EquipmentDetails, CheckoutMode, EquipmentQuery, EquipmentUnit},
    services::eligibility::Eligibility,
};

use super::AuthenticatedUser;

/// Search available equipment
#[utoipa::path(
    get,
    path = "/equipment/search",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Matching units, nearest first", body = Vec<EquipmentUnit>)
    )
)]
pub async fn search_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<Vec<EquipmentUnit>>> {
    let units = state.services.equipment.search(&query).await?;
    Ok(Json(units))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Unit ID, e.g. BTG-1045")),
    responses(
        (status = 200, description = "Equipment details", body = EquipmentDetails),
        (status = 404, description = "Unknown unit")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<EquipmentDetails>> {
    let details = state.services.equipment.get_by_id(&id).await?;
    Ok(Json(details))
}

fn default_mode() -> CheckoutMode {
    CheckoutMode::Checkout
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EligibilityQuery {
    /// "checkout" (default) or "reserve"
    #[serde(default = "default_mode")]
    #[param(value_type = Option<String>)]
    pub mode: CheckoutMode,
}

/// May the current user operate this unit?
#[utoipa::path(
    get,
    path = "/equipment/{id}/eligibility",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Unit ID"),
        EligibilityQuery
    ),
    responses(
        (status = 200, description = "Gate decision", body = Eligibility),
        (status = 404, description = "Unknown unit")
    )
)]
pub async fn get_eligibility(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<EligibilityQuery>,
) -> AppResult<Json<Eligibility>> {
    let decision = state
        .services
        .equipment
        .eligibility(&claims.user_id, &id, query.mode)
        .await?;
    Ok(Json(decision))
}
