//! Current user endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{ConfirmationReceipt, UserCertification},
};

use super::AuthenticatedUser;

/// Certifications held by the current user
#[utoipa::path(
    get,
    path = "/me/certifications",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Held certifications", body = Vec<UserCertification>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_certifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserCertification>>> {
    let certifications = state.services.equipment.certifications(&claims.user_id).await?;
    Ok(Json(certifications))
}

/// Units the current user has checked out during this server's lifetime
#[utoipa::path(
    get,
    path = "/me/equipment",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Checkout receipts", body = Vec<ConfirmationReceipt>)
    )
)]
pub async fn my_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ConfirmationReceipt>>> {
    Ok(Json(
        state.services.checkout.confirmed_checkouts(&claims.user_id).await,
    ))
}
