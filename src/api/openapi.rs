//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{checkout, equipment, health, settings, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GSE Checkout API",
        version = "0.3.0",
        description = "Ground support equipment checkout and reservation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::search_equipment,
        equipment::get_equipment,
        equipment::get_eligibility,
        // Current user
        users::my_certifications,
        users::my_equipment,
        // Checkout
        checkout::open_checkout,
        checkout::get_session,
        checkout::close_session,
        checkout::update_intent,
        checkout::submit,
        // Scanner
        checkout::request_scan,
        checkout::close_scanner,
        checkout::push_frame,
        checkout::scan_result,
        checkout::camera_denied,
        // Settings
        settings::get_settings,
        settings::update_settings,
    ),
    components(
        schemas(
            // Equipment
            crate::models::equipment::EquipmentUnit,
            crate::models::equipment::EquipmentDetails,
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::EquipmentCategory,
            crate::models::equipment::EquipmentClass,
            crate::models::equipment::EquipmentQuery,
            crate::services::eligibility::Eligibility,
            // Certifications
            crate::models::certification::CertificationName,
            crate::models::certification::CertificationStatus,
            crate::models::certification::UserCertification,
            // Checkout
            crate::models::checkout::CheckoutMode,
            crate::models::checkout::ReturnPolicy,
            crate::models::checkout::SessionPhase,
            crate::models::checkout::ScannerStatus,
            crate::models::checkout::NavigationLinks,
            crate::models::checkout::RecoveryLinks,
            crate::models::checkout::ConfirmationReceipt,
            crate::models::checkout::SessionView,
            crate::models::checkout::OpenCheckoutRequest,
            crate::models::checkout::OpenCheckoutResponse,
            crate::models::checkout::UpdateIntentRequest,
            crate::models::checkout::SubmitOutcome,
            crate::models::checkout::FrameUpload,
            crate::models::checkout::FrameAck,
            crate::models::checkout::ScanResultRequest,
            // Settings
            crate::models::settings::Theme,
            crate::models::settings::PortalSettings,
            crate::models::settings::UpdateSettingsRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment search and eligibility"),
        (name = "users", description = "Current user"),
        (name = "checkout", description = "Checkout and reservation sessions"),
        (name = "scanner", description = "Equipment code verification"),
        (name = "settings", description = "Portal feature flags and theme")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
