//! Integration tests for the HTTP surfaces.
//!
//! These drive the real routers with in-memory requests. The interest
//! registry is bound the same way bootstrap binds it, over a storage
//! client built from a registry record.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use stratus_core::api::{AppState, routes};
use stratus_core::configuration::ConfigurationManager;
use stratus_core::registry::{InterestRegistry, Protocol, ServiceRegistry, ServiceType};
use stratus_core::storage::StorageClient;

/// State with an empty registry and no interest registry bound.
fn bare_state() -> AppState {
    AppState::new(Arc::new(ServiceRegistry::new()))
}

/// State wired the way the sequencer wires it after storage comes up:
/// interest registry over the configuration manager, cascade linked.
fn ready_state() -> AppState {
    let registry = Arc::new(ServiceRegistry::new());
    let record = registry
        .register(
            "Stratus Storage",
            ServiceType::Storage,
            "127.0.0.1",
            None,
            8090,
            Protocol::Http,
        )
        .expect("storage record registers");
    let storage = Arc::new(StorageClient::from_record(&record).expect("storage client builds"));
    let interests = Arc::new(InterestRegistry::new(Arc::new(ConfigurationManager::new(
        storage,
    ))));
    registry.link_interest_registry(interests.clone());

    let state = AppState::new(registry);
    state.bind_interests(interests);
    state
}

async fn send_json(app: &Router, method: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds");
    dispatch(app, request).await
}

async fn send(app: &Router, method: &str, path: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("request builds");
    dispatch(app, request).await
}

async fn dispatch(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request is served");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };
    (status, value)
}

mod service_lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_filter_delete_roundtrip() {
        let app = routes::management_router(bare_state());

        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "Storage-1",
                "type": "Storage",
                "address": "127.0.0.1",
                "management_port": 8090
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().expect("response carries an id").to_string();
        assert!(!id.is_empty());

        let (status, body) = send(&app, "GET", "/service?type=Storage").await;
        assert_eq!(status, StatusCode::OK);
        let services = body["services"].as_array().expect("services array");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0]["name"], "Storage-1");
        assert_eq!(services[0]["status"], "Running");
        assert_eq!(services[0]["id"].as_str(), Some(id.as_str()));

        let (status, _) = send(&app, "DELETE", &format!("/service/{id}")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/service?type=Storage").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["services"].as_array().expect("services array").is_empty());
    }

    #[tokio::test]
    async fn test_conflicts_report_distinct_codes() {
        let app = routes::management_router(bare_state());

        let (status, _) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "south-1",
                "type": "Southbound",
                "address": "10.0.0.2",
                "service_port": 6683,
                "management_port": 1081
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Same name, everything else free.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "south-1",
                "type": "Southbound",
                "address": "10.0.0.3",
                "service_port": 6684,
                "management_port": 1082
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ALREADY_EXISTS_BY_NAME");

        // Same address and service port.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "south-2",
                "type": "Southbound",
                "address": "10.0.0.2",
                "service_port": 6683,
                "management_port": 1082
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ALREADY_EXISTS_BY_ADDRESS_AND_SERVICE_PORT");

        // Same address and management port, service port free.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "south-3",
                "type": "Southbound",
                "address": "10.0.0.2",
                "service_port": 6685,
                "management_port": 1081
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ALREADY_EXISTS_BY_ADDRESS_AND_MANAGEMENT_PORT");
    }

    #[tokio::test]
    async fn test_unknown_delete_is_rejected() {
        let app = routes::management_router(bare_state());
        let (status, body) = send(&app, "DELETE", "/service/no-such-id").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(
            body["message"]
                .as_str()
                .expect("message present")
                .contains("does not exist")
        );
    }

    #[tokio::test]
    async fn test_invalid_type_filter_is_rejected() {
        let app = routes::management_router(bare_state());
        let (status, body) = send(&app, "GET", "/service?type=Bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_name_filter_and_unfiltered_listing() {
        let app = routes::management_router(bare_state());
        for (name, mgmt) in [("a", 1081), ("b", 1082)] {
            let (status, _) = send_json(
                &app,
                "POST",
                "/service",
                json!({
                    "name": name,
                    "type": "Notification",
                    "address": "127.0.0.1",
                    "management_port": mgmt
                }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, "GET", "/service?name=a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["services"].as_array().expect("array").len(), 1);

        let (status, body) = send(&app, "GET", "/service").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["services"].as_array().expect("array").len(), 2);

        let (status, body) = send(&app, "GET", "/service?name=zzz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["services"].as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_rejected() {
        let app = routes::management_router(bare_state());

        // Unknown field.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "s",
                "type": "Storage",
                "address": "127.0.0.1",
                "management_port": 8090,
                "extra": true
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");

        // Missing management port.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({"name": "s", "type": "Storage", "address": "127.0.0.1"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");

        // Wrong type for a field.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "s",
                "type": "Storage",
                "address": "127.0.0.1",
                "management_port": "not-a-port"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");

        // Zero port passes decoding but fails validation.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "s",
                "type": "Storage",
                "address": "127.0.0.1",
                "management_port": 0
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");

        // Unknown service type value.
        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "s",
                "type": "Teleport",
                "address": "127.0.0.1",
                "management_port": 8090
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");
    }
}

mod interest_lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_duplicate_delete_roundtrip() {
        let app = routes::management_router(ready_state());

        let (status, body) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "COAP", "service": "svc-123"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().expect("interest id").to_string();

        let (status, body) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "COAP", "service": "svc-123"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INTEREST_ALREADY_EXISTS");
        assert!(
            body["message"]
                .as_str()
                .expect("message present")
                .contains("already exists")
        );

        let (status, _) = send(&app, "DELETE", &format!("/interest/{id}")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "DELETE", &format!("/interest/{id}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["message"]
                .as_str()
                .expect("message present")
                .contains("does not exist")
        );
    }

    #[tokio::test]
    async fn test_interest_endpoints_before_ready_answer_503() {
        let app = routes::management_router(bare_state());

        let (status, body) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "COAP", "service": "svc-123"}),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

        let (status, _) = send(&app, "DELETE", "/interest/whatever").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unregistering_a_service_cascades_its_interests() {
        let app = routes::management_router(ready_state());

        let (status, body) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "south-1",
                "type": "Southbound",
                "address": "10.0.0.9",
                "management_port": 1081
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let service_id = body["id"].as_str().expect("service id").to_string();

        let (status, body) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "NETWORK", "service": service_id}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let interest_id = body["id"].as_str().expect("interest id").to_string();

        let (status, _) = send(&app, "DELETE", &format!("/service/{service_id}")).await;
        assert_eq!(status, StatusCode::OK);

        // The cascade already removed the interest.
        let (status, body) = send(&app, "DELETE", &format!("/interest/{interest_id}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let app = routes::management_router(ready_state());

        let (status, body) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "COAP", "service": "  "}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");

        let (status, body) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "", "service": "svc-1"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");
    }
}

mod ping_tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_reports_uptime() {
        let app = routes::management_router(bare_state());
        let (status, body) = send(&app, "GET", "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["uptime"].is_u64());
    }
}

mod public_surface_tests {
    use super::*;

    #[tokio::test]
    async fn test_public_surface_is_read_only() {
        let app = routes::public_router(bare_state());

        let (status, _) = send(&app, "GET", "/service").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", "/ping").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send_json(
            &app,
            "POST",
            "/service",
            json!({
                "name": "s",
                "type": "Storage",
                "address": "127.0.0.1",
                "management_port": 8090
            }),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send_json(
            &app,
            "POST",
            "/interest",
            json!({"category": "COAP", "service": "svc-1"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
