//! HTTP API for the Custos node.
//!
//! The route table depends on the operating mode: issuer nodes manage
//! profiles, issue, store and revoke; verifier nodes verify credentials and
//! presentations. Routes outside the mode are not registered.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use custos_core::Mode;
use custos_credentials::{
    ComposeCredentialRequest, CreateCredentialRequest, CreateProfileRequest, CredentialService,
    IssueCredentialRequest, StoreCredentialRequest, UpdateStatusRequest, VerifyChecksRequest,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

type AppState = Arc<CredentialService>;
type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "currentTime")]
    pub current_time: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrieveParams {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub profile: String,
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "success".into(),
        current_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

async fn handle_create_profile(
    State(svc): State<AppState>,
    payload: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let profile = svc.create_profile(req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn handle_get_profile(State(svc): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(svc.get_profile(&id)?))
}

async fn handle_create_credential(
    State(svc): State<AppState>,
    payload: Result<Json<CreateCredentialRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let credential = svc.issue(req).await?;
    Ok((StatusCode::CREATED, Json(credential)))
}

async fn handle_issue_credential(
    State(svc): State<AppState>,
    payload: Result<Json<IssueCredentialRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let credential = svc.issue_credential(req).await?;
    Ok((StatusCode::CREATED, Json(credential)))
}

async fn handle_compose_and_issue(
    State(svc): State<AppState>,
    payload: Result<Json<ComposeCredentialRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let credential = svc.compose_and_issue(req).await?;
    Ok((StatusCode::CREATED, Json(credential)))
}

async fn handle_verify(State(svc): State<AppState>, body: Bytes) -> ApiResult<impl IntoResponse> {
    Ok(Json(svc.verify_credential(&body).await?))
}

async fn handle_verify_presentation(State(svc): State<AppState>, body: Bytes) -> impl IntoResponse {
    Json(svc.verify_presentation(&body).await)
}

async fn handle_verifications(
    State(svc): State<AppState>,
    payload: Result<Json<VerifyChecksRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let outcome = svc.verify_checks(req).await;
    let status = if outcome.is_passed() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}

async fn handle_store(
    State(svc): State<AppState>,
    payload: Result<Json<StoreCredentialRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = payload?;
    svc.store(req).await?;
    Ok(StatusCode::OK)
}

async fn handle_retrieve(
    State(svc): State<AppState>,
    Query(params): Query<RetrieveParams>,
) -> ApiResult<impl IntoResponse> {
    let credential = svc.retrieve(&params.profile, &params.id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], credential))
}

async fn handle_update_status(
    State(svc): State<AppState>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = payload?;
    svc.update_status(req).await?;
    Ok(StatusCode::OK)
}

async fn handle_status(State(svc): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(svc.status_page(&id).await?))
}

async fn handle_generate_keypair(State(svc): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(svc.generate_keypair()?))
}

// --- Server ---

fn issuer_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", post(handle_create_profile))
        .route("/profile/{id}", get(handle_get_profile))
        .route("/credential", post(handle_create_credential))
        .route("/store", post(handle_store))
        .route("/verify", post(handle_verify))
        .route("/updateStatus", post(handle_update_status))
        .route("/retrieve", get(handle_retrieve))
        .route("/status/{id}", get(handle_status))
        .route("/kms/generatekeypair", get(handle_generate_keypair))
        .route("/credentials/issueCredential", post(handle_issue_credential))
        .route("/credentials/composeAndIssueCredential", post(handle_compose_and_issue))
        .route("/verifications", post(handle_verifications))
}

fn verifier_routes() -> Router<AppState> {
    Router::new()
        .route("/verify", post(handle_verify))
        .route("/verifyPresentation", post(handle_verify_presentation))
        .route("/verifications", post(handle_verifications))
        .route("/verifier/credentials", post(handle_verifications))
}

pub fn build_router(mode: Mode, service: AppState, request_timeout: Duration) -> Router {
    let routes = match mode {
        Mode::Issuer => issuer_routes(),
        Mode::Verifier => verifier_routes(),
    };
    routes
        .route("/healthcheck", get(handle_health))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
