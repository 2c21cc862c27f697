//! Checkout session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        checkout::{
            FrameAck, FrameUpload, OpenCheckoutRequest, OpenCheckoutResponse, ScanResultRequest,
            SubmitOutcome, UpdateIntentRequest,
        },
        SessionView,
    },
};

use super::AuthenticatedUser;

/// Open checkout or reservation for a unit
///
/// Answers 200 in every case: with the session view when the user may
/// proceed, otherwise with the certification-required or unavailable view.
#[utoipa::path(
    post,
    path = "/checkout",
    tag = "checkout",
    security(("bearer_auth" = [])),
    request_body = OpenCheckoutRequest,
    responses(
        (status = 200, description = "Session opened or gate view", body = OpenCheckoutResponse),
        (status = 404, description = "Unknown unit")
    )
)]
pub async fn open_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<OpenCheckoutRequest>,
) -> AppResult<Json<OpenCheckoutResponse>> {
    let response = state.services.checkout.open(&claims.user_id, request).await?;
    Ok(Json(response))
}

/// Get a checkout session
#[utoipa::path(
    get,
    path = "/checkout/{id}",
    tag = "checkout",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session view", body = SessionView),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let view = state.services.checkout.get(&claims.user_id, id).await?;
    Ok(Json(view))
}

/// Leave the checkout view; cancels any pending submission
#[utoipa::path(
    delete,
    path = "/checkout/{id}",
    tag = "checkout",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn close_session(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.checkout.close(&claims.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the return policy (checkout) or reservation date (reserve)
#[utoipa::path(
    put,
    path = "/checkout/{id}/intent",
    tag = "checkout",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = UpdateIntentRequest,
    responses(
        (status = 200, description = "Updated session", body = SessionView),
        (status = 400, description = "Invalid intent for this mode"),
        (status = 409, description = "Session is submitting or confirmed")
    )
)]
pub async fn update_intent(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateIntentRequest>,
) -> AppResult<Json<SessionView>> {
    let view = state
        .services
        .checkout
        .update_intent(&claims.user_id, id, request)
        .await?;
    Ok(Json(view))
}

/// Submit the checkout or reservation
#[utoipa::path(
    post,
    path = "/checkout/{id}/submit",
    tag = "checkout",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Confirmed, or verification required", body = SubmitOutcome),
        (status = 409, description = "Already submitting or confirmed"),
        (status = 502, description = "Backend rejected the submission")
    )
)]
pub async fn submit(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubmitOutcome>> {
    let outcome = state.services.checkout.submit(&claims.user_id, id).await?;
    Ok(Json(outcome))
}

/// Open the verification scanner
#[utoipa::path(
    post,
    path = "/checkout/{id}/scan",
    tag = "scanner",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Scanner opened", body = SessionView)
    )
)]
pub async fn request_scan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let view = state.services.checkout.request_scan(&claims.user_id, id).await?;
    Ok(Json(view))
}

/// Close the verification scanner
#[utoipa::path(
    delete,
    path = "/checkout/{id}/scan",
    tag = "scanner",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Scanner closed", body = SessionView)
    )
)]
pub async fn close_scanner(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let view = state.services.checkout.close_scanner(&claims.user_id, id).await?;
    Ok(Json(view))
}

/// Push a camera frame to the open scanner
#[utoipa::path(
    post,
    path = "/checkout/{id}/scan/frames",
    tag = "scanner",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = FrameUpload,
    responses(
        (status = 202, description = "Frame queued or dropped", body = FrameAck),
        (status = 409, description = "Scanner not open")
    )
)]
pub async fn push_frame(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(upload): Json<FrameUpload>,
) -> AppResult<(StatusCode, Json<FrameAck>)> {
    let ack = state
        .services
        .checkout
        .push_frame(&claims.user_id, id, upload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// Report a payload decoded on the client
#[utoipa::path(
    post,
    path = "/checkout/{id}/scan/result",
    tag = "scanner",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = ScanResultRequest,
    responses(
        (status = 200, description = "Session after the scan", body = SessionView),
        (status = 409, description = "Scanner not open")
    )
)]
pub async fn scan_result(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ScanResultRequest>,
) -> AppResult<Json<SessionView>> {
    let view = state
        .services
        .checkout
        .scan_result(&claims.user_id, id, &request.payload)
        .await?;
    Ok(Json(view))
}

/// Report that camera access was denied
#[utoipa::path(
    post,
    path = "/checkout/{id}/scan/denied",
    tag = "scanner",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Scanner shows the permission message", body = SessionView)
    )
)]
pub async fn camera_denied(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let view = state.services.checkout.camera_denied(&claims.user_id, id).await?;
    Ok(Json(view))
}
