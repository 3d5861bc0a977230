//! HTTP-level tests for the OSBAPI surface
//!
//! These exercise the router without a network listener. The chart engine
//! binary is pointed at a path that does not exist and the cluster client
//! at an address nothing listens on, so only handlers that stay inside the
//! broker are expected to succeed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use helmi_broker::{http as broker_http, AppState, Config};
use helmi_catalog::Catalog;
use helmi_helm::HelmClient;
use helmi_kube::ClusterClient;

const DEFINITION: &str = r#"---
service:
  _id: "486e8c4b"
  _name: "postgresql"
  description: "dedicated postgresql"
  tags:
  - database
  chart: stable/postgresql
  plans:
  - _id: "f1b10f98"
    _name: standalone
    description: "single instance"
---
chart-values: {}
---
user-credentials: {}
"#;

fn offline_cluster() -> ClusterClient {
    // pin a crypto provider before the first builder call
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();

    let kube_config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
    ClusterClient::from_client(kube::Client::try_from(kube_config).unwrap())
}

fn test_state(config: Config) -> AppState {
    let catalog = Arc::new(Catalog::from_definition(DEFINITION).unwrap());
    AppState::new(
        Arc::new(config),
        catalog,
        HelmClient::with_binary("/nonexistent/helm-binary"),
        offline_cluster(),
    )
}

fn app(config: Config) -> axum::Router {
    broker_http::router(test_state(config))
}

fn authenticated_config() -> Config {
    Config {
        username: "admin".into(),
        password: "secret".into(),
        ..Config::default()
    }
}

fn basic_auth_header(user: &str, password: &str) -> String {
    use base64::Engine as _;
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password))
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn liveness_is_public() {
    let response = app(authenticated_config())
        .oneshot(
            Request::builder()
                .uri("/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readiness_reports_engine_failure() {
    let response = app(Config::default())
        .oneshot(
            Request::builder()
                .uri("/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn catalog_requires_auth_when_configured() {
    let response = app(authenticated_config())
        .oneshot(
            Request::builder()
                .uri("/v2/catalog")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_rejects_wrong_credentials() {
    let response = app(authenticated_config())
        .oneshot(
            Request::builder()
                .uri("/v2/catalog")
                .header(header::AUTHORIZATION, basic_auth_header("admin", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_serves_service_documents() {
    let response = app(authenticated_config())
        .oneshot(
            Request::builder()
                .uri("/v2/catalog")
                .header(header::AUTHORIZATION, basic_auth_header("admin", "secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["services"][0]["id"], "486e8c4b");
    assert_eq!(body["services"][0]["bindable"], true);
    assert_eq!(body["services"][0]["plan_updateable"], false);
    assert_eq!(body["services"][0]["plans"][0]["id"], "f1b10f98");
    assert_eq!(body["services"][0]["plans"][0]["free"], true);
}

#[tokio::test]
async fn catalog_is_open_when_auth_disabled() {
    let response = app(Config::default())
        .oneshot(
            Request::builder()
                .uri("/v2/catalog")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn update_rejects_plan_changes() {
    let response = app(Config::default())
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/v2/service_instances/abc")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"service_id": "486e8c4b", "plan_id": "other"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "PlanChangeNotSupported");
}

#[tokio::test]
async fn provision_with_unknown_service_fails() {
    let response = app(Config::default())
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/v2/service_instances/abc?accepts_incomplete=true")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"service_id": "no-such-service", "plan_id": "no-such-plan"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["description"]
        .as_str()
        .unwrap()
        .contains("no-such-service"));
}
