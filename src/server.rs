//! HTTP proxy server.
//!
//! Exposes the taxonomy proxy and the lead forwarder as a JSON HTTP API
//! for browser and CLI clients. The Graph API credential stays on this side.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/interests` | Interest search (`q`, `limit`, `country`) |
//! | `GET`  | `/behaviors` | Behavior search (`q`, `limit`) |
//! | `GET`  | `/categories` | Targeting category search (`klass`, `q`, `limit`) |
//! | `GET`  | `/targeting` | Work/education search (`type`, `q`, `limit`) |
//! | `POST` | `/consult` | Forward a lead to the webhook |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every taxonomy and consult response uses the `ok` envelope:
//!
//! ```json
//! { "ok": false, "error": "Unsupported type" }
//! ```
//!
//! Taxonomy endpoints answer `400` only for a missing or unsupported
//! discriminator. Upstream trouble is reported as `200` with
//! `notAvailable: true` so clients can show an empty list.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use targeting_finder_core::models::ProxyResponse;
use targeting_finder_core::request::Endpoint;

use crate::config::Config;
use crate::graph::{GraphApi, TargetingApi};
use crate::lead::{ForwardError, LeadForwarder};
use crate::proxy::{RequestError, TaxonomyProxy, TaxonomyQuery};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    proxy: TaxonomyProxy,
    leads: LeadForwarder,
}

impl AppState {
    pub fn new(proxy: TaxonomyProxy, leads: LeadForwarder) -> Self {
        Self { proxy, leads }
    }

    /// State wired to the real Graph API and webhook from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api: Arc<dyn TargetingApi> = Arc::new(GraphApi::new(&config.upstream)?);
        Ok(Self::new(
            TaxonomyProxy::new(api, config.upstream.locale.clone()),
            LeadForwarder::new(&config.lead)?,
        ))
    }
}

/// Starts the proxy server on `[server].bind`.
///
/// Runs until the process is terminated. Returns an error if the state
/// cannot be built or the address cannot be bound.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    if config.upstream.access_token.is_none() {
        tracing::warn!("META_ACCESS_TOKEN is not set; taxonomy searches will report notAvailable");
    }
    if config.lead.webhook_url.is_none() {
        tracing::warn!("no lead webhook configured; /consult will fail");
    }

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    println!("Targeting proxy listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// The application router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/interests", get(handle_interests))
        .route("/behaviors", get(handle_behaviors))
        .route("/categories", get(handle_categories))
        .route("/targeting", get(handle_targeting))
        .route("/consult", any(handle_consult))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Internal error type that converts into an `{ok:false, error}` response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ProxyResponse::failure(self.message))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        bad_request(err.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<ForwardError> for AppError {
    fn from(err: ForwardError) -> Self {
        internal(err.to_string())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Taxonomy endpoints ============

/// Query strings that do not parse still get the JSON envelope.
type TaxonomyParams = Result<Query<TaxonomyQuery>, QueryRejection>;

async fn taxonomy(
    state: &AppState,
    endpoint: Endpoint,
    params: TaxonomyParams,
) -> Result<Json<ProxyResponse>, AppError> {
    let Query(query) = params?;
    Ok(Json(state.proxy.handle(endpoint, &query).await?))
}

async fn handle_interests(
    State(state): State<AppState>,
    params: TaxonomyParams,
) -> Result<Json<ProxyResponse>, AppError> {
    taxonomy(&state, Endpoint::Interests, params).await
}

async fn handle_behaviors(
    State(state): State<AppState>,
    params: TaxonomyParams,
) -> Result<Json<ProxyResponse>, AppError> {
    taxonomy(&state, Endpoint::Behaviors, params).await
}

async fn handle_categories(
    State(state): State<AppState>,
    params: TaxonomyParams,
) -> Result<Json<ProxyResponse>, AppError> {
    taxonomy(&state, Endpoint::Categories, params).await
}

async fn handle_targeting(
    State(state): State<AppState>,
    params: TaxonomyParams,
) -> Result<Json<ProxyResponse>, AppError> {
    taxonomy(&state, Endpoint::Targeting, params).await
}

// ============ /consult ============

/// Handler for `/consult`.
///
/// Accepts only `POST` with a JSON body, which is relayed to the lead
/// webhook unchanged. `405` for other methods, `400` for a body that is
/// not JSON, `500` when the webhook is missing, unreachable, or refuses.
async fn handle_consult(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    if method != Method::POST {
        return Err(AppError {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_string(),
        });
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| bad_request("Request body must be JSON"))?;

    if let Err(err) = state.leads.forward(&payload).await {
        tracing::warn!(error = %err, "lead forwarding failed");
        return Err(err.into());
    }

    tracing::info!("lead forwarded");
    Ok(Json(serde_json::json!({ "ok": true })))
}
