//! API handlers for the GSE checkout REST endpoints

pub mod checkout;
pub mod equipment;
pub mod health;
pub mod openapi;
pub mod settings;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Authentication("Missing or invalid authorization header".to_string())
                })?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Equipment
        .route("/equipment/search", get(equipment::search_equipment))
        .route("/equipment/:id", get(equipment::get_equipment))
        .route("/equipment/:id/eligibility", get(equipment::get_eligibility))
        // Current user
        .route("/me/certifications", get(users::my_certifications))
        .route("/me/equipment", get(users::my_equipment))
        // Checkout sessions
        .route("/checkout", post(checkout::open_checkout))
        .route(
            "/checkout/:id",
            get(checkout::get_session).delete(checkout::close_session),
        )
        .route("/checkout/:id/intent", axum::routing::put(checkout::update_intent))
        .route("/checkout/:id/submit", post(checkout::submit))
        .route(
            "/checkout/:id/scan",
            post(checkout::request_scan).delete(checkout::close_scanner),
        )
        .route("/checkout/:id/scan/frames", post(checkout::push_frame))
        .route("/checkout/:id/scan/result", post(checkout::scan_result))
        .route("/checkout/:id/scan/denied", post(checkout::camera_denied))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
