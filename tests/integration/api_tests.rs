//! API integration tests
//!
//! Drives the full router in process against the bundled fixtures.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use gse_checkout_server::{
    api,
    config::AppConfig,
    models::{Role, UserClaims},
    repository::Repository,
    services::{clock::SystemClock, gateway, scanner::QrDecoder, settings::SettingsService, Services},
    AppState,
};

const SECRET: &str = "integration-test-secret";
/// Tokens issued for this user carry the admin role
const ADMIN: &str = "ADM-0001";

struct TestApp {
    router: Router,
    _data: TempDir,
}

fn test_app() -> TestApp {
    let data = tempfile::tempdir().expect("tempdir");
    let root = env!("CARGO_MANIFEST_DIR");

    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.fixtures.equipment_path = format!("{}/fixtures/equipment.json", root);
    config.fixtures.certifications_path = format!("{}/fixtures/certifications.json", root);
    config.gateway.simulated_latency_ms = 10;
    config.settings.path = data.path().join("settings.json").display().to_string();

    let repository = Repository::from_config(&config).expect("fixtures load");
    let gateway = gateway::from_config(&config.gateway).expect("gateway");
    let settings = SettingsService::load(&config.settings.path).expect("settings");
    let config = Arc::new(config);
    let services = Services::new(
        config.clone(),
        repository,
        gateway,
        Arc::new(QrDecoder),
        settings,
        Arc::new(SystemClock),
    )
    .expect("services");

    let state = AppState {
        config,
        services: Arc::new(services),
    };

    TestApp {
        router: api::create_router(state),
        _data: data,
    }
}

fn token(user_id: &str) -> String {
    let role = if user_id == ADMIN { Role::Admin } else { Role::Operator };
    UserClaims::new(user_id, None, 1)
        .with_role(role)
        .create_token(SECRET)
        .expect("token")
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(format!("/api/v1{}", uri));
        if let Some(user) = user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn open(&self, user: &str, equipment_id: &str, mode: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/checkout",
            Some(user),
            Some(json!({ "equipment_id": equipment_id, "mode": mode })),
        )
        .await
    }

    async fn open_session(&self, user: &str, equipment_id: &str, mode: &str) -> String {
        let (status, body) = self.open(user, equipment_id, mode).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "session", "unexpected body {}", body);
        body["session"]["id"].as_str().expect("session id").to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.call(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_requires_authentication() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/equipment/search", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_search_by_code() {
    let app = test_app();
    let (status, body) = app
        .call(
            Method::GET,
            "/equipment/search?query=BTG&type_filter=all&aircraft_filter=all&include_in_use=false",
            Some("EMP-2201"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let units = body.as_array().expect("array");
    assert!(!units.is_empty());
    for unit in units {
        assert_eq!(unit["status"], "Available");
        let id = unit["id"].as_str().unwrap().to_lowercase();
        let type_name = unit["type"].as_str().unwrap().to_lowercase();
        assert!(id.contains("btg") || type_name.contains("btg"));
    }
    assert!(units.iter().any(|u| u["id"] == "BTG-1045"));
    assert!(units.iter().all(|u| u["id"] != "BTG-1046"));
}

#[tokio::test]
async fn test_search_defaults_and_in_use() {
    let app = test_app();
    let (_, without) = app
        .call(Method::GET, "/equipment/search", Some("EMP-2201"), None)
        .await;
    let (_, with) = app
        .call(
            Method::GET,
            "/equipment/search?include_in_use=true",
            Some("EMP-2201"),
            None,
        )
        .await;
    let without = without.as_array().unwrap();
    let with = with.as_array().unwrap();
    assert!(with.len() > without.len());
    assert!(with.iter().all(|u| u["status"] != "Maintenance"));
}

#[tokio::test]
async fn test_equipment_details() {
    let app = test_app();
    let (status, body) = app
        .call(Method::GET, "/equipment/GPU-0007", Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["class"], "B");
    assert_eq!(body["certificationRequired"], "GPU Operation");

    let (status, _) = app
        .call(Method::GET, "/equipment/XYZ-0000", Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_eligibility_endpoint() {
    let app = test_app();
    let (status, body) = app
        .call(
            Method::GET,
            "/equipment/BTG-1045/eligibility",
            Some("EMP-2201"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "eligible");

    // in use: reservable but not checkout-able
    let (_, body) = app
        .call(
            Method::GET,
            "/equipment/BTG-1046/eligibility?mode=checkout",
            Some("EMP-2201"),
            None,
        )
        .await;
    assert_eq!(body["result"], "unavailable");
    let (_, body) = app
        .call(
            Method::GET,
            "/equipment/BTG-1046/eligibility?mode=reserve",
            Some("EMP-2201"),
            None,
        )
        .await;
    assert_eq!(body["result"], "eligible");
}

#[tokio::test]
async fn test_my_certifications() {
    let app = test_app();
    let (status, body) = app
        .call(Method::GET, "/me/certifications", Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = app
        .call(Method::GET, "/me/certifications", Some("EMP-9999"), None)
        .await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_certification_required_view() {
    let app = test_app();
    let (status, body) = app.open("EMP-4102", "BTG-1045", "checkout").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "certification_required");
    assert_eq!(body["required_certification"], "Basic GSE");
    assert_eq!(body["links"]["search"], "/equipment/search");
    assert_eq!(body["links"]["profile"], "/me/certifications");
    assert!(body.get("session").is_none());
}

#[tokio::test]
async fn test_universal_unit_needs_no_certification() {
    let app = test_app();
    app.open_session("EMP-4102", "TB-0311", "checkout").await;
}

#[tokio::test]
async fn test_checkout_flow() {
    let app = test_app();
    let id = app.open_session("EMP-2201", "BTG-1045", "checkout").await;

    // first submit asks for verification and opens the scanner
    let (status, body) = app
        .call(Method::POST, &format!("/checkout/{}/submit", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verification_required");
    assert_eq!(body["session"]["scanner"], "scanning");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/checkout/{}/scan/result", id),
            Some("EMP-2201"),
            Some(json!({ "payload": "BTG-1045" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["scanner"], "closed");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/checkout/{}/intent", id),
            Some("EMP-2201"),
            Some(json!({ "return_policy": { "policy": "end_of_shift" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estimated_return"], "6:00 PM");

    let (status, body) = app
        .call(Method::POST, &format!("/checkout/{}/submit", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert!(body["receipt"]["confirmation_number"]
        .as_str()
        .unwrap()
        .starts_with("GSE-"));
    assert_eq!(body["receipt"]["resolved_time"], "6:00 PM");
    assert_eq!(body["receipt"]["links"]["my_equipment"], "/me/equipment");
    assert_eq!(body["session"]["phase"], "confirmed");

    let (_, body) = app
        .call(Method::GET, "/me/equipment", Some("EMP-2201"), None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/checkout/{}/intent", id),
            Some("EMP-2201"),
            Some(json!({ "return_policy": { "policy": "duration", "hours": 2 } })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reservation_dates() {
    let app = test_app();
    let id = app.open_session("EMP-2201", "BTG-1046", "reserve").await;
    let today = Local::now().date_naive();

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/checkout/{}/intent", id),
            Some("EMP-2201"),
            Some(json!({ "reservation_date": (today - Duration::days(1)).to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, &format!("/checkout/{}/submit", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/checkout/{}/intent", id),
            Some("EMP-2201"),
            Some(json!({ "reservation_date": (today + Duration::days(3)).to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::POST, &format!("/checkout/{}/submit", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["receipt"]["mode"], "reserve");
}

#[tokio::test]
async fn test_scanner_frames_and_denial() {
    let app = test_app();
    let id = app.open_session("EMP-2201", "BTG-1045", "checkout").await;

    // no scanner yet
    let frame = json!({ "width": 2, "height": 2, "pixels": STANDARD.encode([255u8; 4]) });
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/checkout/{}/scan/frames", id),
            Some("EMP-2201"),
            Some(frame.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::POST, &format!("/checkout/{}/scan", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanner"], "scanning");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/checkout/{}/scan/frames", id),
            Some("EMP-2201"),
            Some(frame),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body == "queued" || body == "dropped");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/checkout/{}/scan/frames", id),
            Some("EMP-2201"),
            Some(json!({ "width": 2, "height": 2, "pixels": "not base64!" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/checkout/{}/scan/denied", id),
            Some("EMP-2201"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanner"], "permission_denied");
    assert!(body["scanner_message"].is_string());

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/checkout/{}/scan/result", id),
            Some("EMP-2201"),
            Some(json!({ "payload": "BTG-1045" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::DELETE, &format!("/checkout/{}/scan", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanner"], "closed");
    assert_eq!(body["verified"], false);
}

#[tokio::test]
async fn test_sessions_are_per_user() {
    let app = test_app();
    let id = app.open_session("EMP-2201", "BTG-1045", "checkout").await;

    let (status, _) = app
        .call(Method::GET, &format!("/checkout/{}", id), Some("EMP-3310"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::DELETE, &format!("/checkout/{}", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(Method::GET, &format!("/checkout/{}", id), Some("EMP-2201"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/settings", Some("EMP-2201"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], "system");
    assert_eq!(body["strict_scan_match"], false);

    let (status, body) = app
        .call(
            Method::PUT,
            "/settings",
            Some(ADMIN),
            Some(json!({ "theme": "dark", "feature_flags": { "fleet_analytics": true } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["feature_flags"]["fleet_analytics"], true);
    assert_eq!(body["feature_flags"]["equipment_reservations"], true);

    // Operators still read the updated settings
    let (status, body) = app.call(Method::GET, "/settings", Some("EMP-2201"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], "dark");
}

#[tokio::test]
async fn test_operator_cannot_update_settings() {
    let app = test_app();
    let (status, body) = app
        .call(
            Method::PUT,
            "/settings",
            Some("EMP-2201"),
            Some(json!({ "strict_scan_match": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2);
    assert_eq!(body["error"], "NotAuthorized");

    let (_, body) = app.call(Method::GET, "/settings", Some("EMP-2201"), None).await;
    assert_eq!(body["strict_scan_match"], false);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(doc["paths"]["/checkout/{id}/submit"].is_object());
}
