//! The OSBAPI HTTP surface
//!
//! Standard v2 endpoints plus unauthenticated liveness/readiness. Handlers
//! translate broker errors into the status codes platforms key on: 409 for
//! an instance that already exists, 410 for one that is gone, 404 when a
//! bind references a missing instance, 422 for plan changes.

pub mod auth;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value as JsonValue};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use helmi_catalog::Catalog;
use helmi_helm::HelmClient;
use helmi_kube::{ClusterClient, Namespace};

use crate::config::Config;
use crate::error::BrokerError;
use crate::osb::{
    catalog_document, BindRequest, BindResponse, ErrorResponse, InstanceQuery, LastOperationResponse,
    ProvisionRequest, ProvisionResponse, UpdateRequest,
};
use crate::release::{operation_state, ReleaseManager};

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub helm: HelmClient,
    pub cluster: ClusterClient,
    pub releases: Arc<ReleaseManager>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        catalog: Arc<Catalog>,
        helm: HelmClient,
        cluster: ClusterClient,
    ) -> Self {
        let releases = Arc::new(ReleaseManager::new(
            catalog.clone(),
            helm.clone(),
            cluster.clone(),
            config.clone(),
        ));

        Self {
            config,
            catalog,
            helm,
            cluster,
            releases,
        }
    }
}

/// Build the broker router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v2/catalog", get(catalog))
        .route(
            "/v2/service_instances/{instance_id}",
            axum::routing::put(provision)
                .delete(deprovision)
                .patch(update),
        )
        .route(
            "/v2/service_instances/{instance_id}/last_operation",
            get(last_operation),
        )
        .route(
            "/v2/service_instances/{instance_id}/service_bindings/{binding_id}",
            axum::routing::put(bind).delete(unbind),
        )
        .route("/liveness", get(liveness))
        .route("/readiness", get(readiness))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Kubernetes restarts the container when this fails
async fn liveness() -> Json<JsonValue> {
    Json(json!({}))
}

async fn readiness(State(state): State<AppState>) -> Response {
    match state.helm.is_ready().await {
        Ok(()) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(err) => internal_error(err.into()),
    }
}

async fn catalog(State(state): State<AppState>) -> Response {
    Json(catalog_document(&state.catalog.services())).into_response()
}

async fn provision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<InstanceQuery>,
    Json(request): Json<ProvisionRequest>,
) -> Response {
    let namespace = resolve_namespace(&state, &request.context).await;

    let result = state
        .releases
        .install(
            &request.service_id,
            &request.plan_id,
            &instance_id,
            &namespace,
            query.accepts_incomplete,
            &request.parameters,
            &request.context,
        )
        .await;

    match result {
        Ok(()) => {
            let dashboard_url = state
                .releases
                .dashboard_url(
                    &request.service_id,
                    &request.plan_id,
                    &instance_id,
                    &namespace,
                    &request.parameters,
                    &request.context,
                )
                .await;

            let status = if query.accepts_incomplete {
                StatusCode::ACCEPTED
            } else {
                StatusCode::CREATED
            };

            (status, Json(ProvisionResponse { dashboard_url })).into_response()
        }
        Err(BrokerError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("instance already exists")),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

async fn deprovision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(_query): Query<InstanceQuery>,
) -> Response {
    match state.releases.delete(&instance_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(BrokerError::ReleaseNotFound) => (StatusCode::GONE, Json(json!({}))).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Response {
    match state.releases.health(&instance_id).await {
        Ok(health) => {
            let state_value = operation_state(&health, state.config.release_timeout);
            Json(LastOperationResponse {
                state: state_value.as_str(),
            })
            .into_response()
        }
        Err(BrokerError::ReleaseNotFound) => (
            StatusCode::GONE,
            Json(ErrorResponse::new("instance does not exist")),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

async fn update(
    State(_state): State<AppState>,
    Path(_instance_id): Path<String>,
    Json(_request): Json<UpdateRequest>,
) -> Response {
    let err = BrokerError::PlanChangeNotSupported;
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse::coded("PlanChangeNotSupported", err.to_string())),
    )
        .into_response()
}

async fn bind(
    State(state): State<AppState>,
    Path((instance_id, _binding_id)): Path<(String, String)>,
    Json(request): Json<BindRequest>,
) -> Response {
    match state
        .releases
        .credentials(&request.service_id, &request.plan_id, &instance_id)
        .await
    {
        Ok(credentials) => (
            StatusCode::CREATED,
            Json(BindResponse {
                credentials: credentials.into_inner(),
            }),
        )
            .into_response(),
        Err(BrokerError::ReleaseNotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("instance does not exist")),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

async fn unbind(
    State(state): State<AppState>,
    Path((instance_id, _binding_id)): Path<(String, String)>,
) -> Response {
    match state.releases.exists(&instance_id).await {
        Ok(true) => (StatusCode::OK, Json(json!({}))).into_response(),
        Ok(false) => (
            StatusCode::GONE,
            Json(ErrorResponse::new("binding does not exist")),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

/// Pick the install namespace from the raw platform context
///
/// Cloud Foundry contexts select a namespace labelled with the org and
/// space; Kubernetes contexts name one directly. Whatever stays missing
/// falls back to the configured defaults.
async fn resolve_namespace(state: &AppState, context: &JsonValue) -> Namespace {
    let platform = context.get("platform").and_then(JsonValue::as_str);

    let mut namespace = match platform {
        Some("cloudfoundry") => {
            let organization = context.get("organization_guid").and_then(JsonValue::as_str);
            let space = context.get("space_guid").and_then(JsonValue::as_str);

            match (organization, space) {
                (Some(organization), Some(space)) => {
                    let selector = std::collections::BTreeMap::from([
                        ("cf-org".to_string(), organization.to_string()),
                        ("cf-space".to_string(), space.to_string()),
                    ]);
                    match state.cluster.get_namespaces(&selector).await {
                        Ok(mut namespaces) if !namespaces.is_empty() => namespaces.remove(0),
                        Ok(_) => Namespace::default(),
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to select namespace by cf labels");
                            Namespace::default()
                        }
                    }
                }
                _ => Namespace::default(),
            }
        }
        Some("kubernetes") => {
            let declared = context.get("namespace").and_then(JsonValue::as_str);
            match declared {
                Some(declared) => match state.cluster.get_namespace(declared).await {
                    Ok(namespace) => namespace,
                    Err(err) => {
                        tracing::warn!(namespace = declared, error = %err, "failed to look up declared namespace");
                        Namespace {
                            name: declared.to_string(),
                            ingress_domain: String::new(),
                        }
                    }
                },
                None => Namespace::default(),
            }
        }
        _ => Namespace::default(),
    };

    if namespace.name.is_empty() {
        namespace.name = state.config.helm_namespace.clone();
    }
    if namespace.ingress_domain.is_empty() {
        namespace.ingress_domain = state.config.ingress_domain.clone();
    }

    namespace
}

fn internal_error(err: BrokerError) -> Response {
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(err.to_string())),
    )
        .into_response()
}
