//! # Dashboard JSON API
//!
//! `ses-pilot serve` exposes the API facade as JSON routes for a local dashboard.
//! Like the CLI, this is a front-end: it parses requests, calls [`PilotApi`] and
//! turns the outcome into a response. It holds no business logic.
//!
//! The facade is synchronous and shells out to the `aws` CLI, so every call runs
//! on the blocking pool behind a single mutex. Requests are handled one at a time,
//! which keeps the store free of concurrent writers.
//!
//! ## Status Codes
//!
//! | Error                                   | Status |
//! |-----------------------------------------|--------|
//! | `TemplateNotFound`, `RemoteNotFound`    | 404    |
//! | `AlreadyExists`                         | 409    |
//! | `InvalidInput`, `InvalidPath`           | 400    |
//! | anything else                           | 500    |
//!
//! Malformed bodies and query strings are `InvalidInput`, so every error body
//! has the same `{"error": ...}` shape.

mod handlers;

use crate::api::PilotApi;
use crate::error::{Result, SesPilotError};
use crate::remote::SesClient;
use crate::store::TemplateStore;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

pub const DEFAULT_PORT: u16 = 5359;

/// Stores that can back the server.
pub trait ServeStore: TemplateStore + Send + 'static {}
impl<T: TemplateStore + Send + 'static> ServeStore for T {}

/// SES clients that can back the server.
pub trait ServeClient: SesClient + Send + 'static {}
impl<T: SesClient + Send + 'static> ServeClient for T {}

pub type SharedApi<S, C> = Arc<Mutex<PilotApi<S, C>>>;

pub fn router<S: ServeStore, C: ServeClient>(api: PilotApi<S, C>) -> Router {
    use handlers::*;

    let state: SharedApi<S, C> = Arc::new(Mutex::new(api));
    Router::new()
        .route("/api/config", get(show_config::<S, C>))
        .route(
            "/api/templates",
            get(list_templates::<S, C>).post(create_email::<S, C>),
        )
        .route("/api/templates/pull", post(pull::<S, C>))
        .route("/api/templates/pull-all", post(pull_all::<S, C>))
        .route(
            "/api/templates/*path",
            get(show_email::<S, C>)
                .put(update_email::<S, C>)
                .delete(delete_email::<S, C>),
        )
        .route("/api/deploy/*path", post(deploy_email::<S, C>))
        .route("/api/test-email/*path", post(test_email::<S, C>))
        .route("/api/sync-status", get(sync_status::<S, C>))
        .route(
            "/api/verification-templates",
            get(list_verification::<S, C>).post(create_verification::<S, C>),
        )
        .route(
            "/api/verification-templates/*path",
            get(show_verification::<S, C>)
                .put(update_verification::<S, C>)
                .delete(delete_verification::<S, C>)
                .post(verification_action::<S, C>),
        )
        .route("/api/template-counts", get(template_counts::<S, C>))
        .route("/api/permissions", get(permissions::<S, C>))
        .route(
            "/api/folders",
            post(create_folder::<S, C>)
                .put(rename_item::<S, C>)
                .delete(delete_item::<S, C>),
        )
        .route("/api/folders/move", post(move_template::<S, C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve<S: ServeStore, C: ServeClient>(api: PilotApi<S, C>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard API listening");
    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

/// Runs `work` against the shared API on the blocking pool.
pub(crate) async fn blocking<S, C, T, F>(api: SharedApi<S, C>, work: F) -> std::result::Result<T, ApiError>
where
    S: ServeStore,
    C: ServeClient,
    T: Send + 'static,
    F: FnOnce(&mut PilotApi<S, C>) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = api
            .lock()
            .map_err(|_| SesPilotError::Api("API state lock poisoned".to_string()))?;
        work(&mut guard)
    })
    .await
    .map_err(|e| ApiError(SesPilotError::Api(format!("worker task failed: {}", e))))?
    .map_err(ApiError)
}

/// A library error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub SesPilotError);

impl From<SesPilotError> for ApiError {
    fn from(err: SesPilotError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(SesPilotError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(SesPilotError::InvalidInput(rejection.body_text()))
    }
}

pub fn status_for(err: &SesPilotError) -> StatusCode {
    match err {
        SesPilotError::TemplateNotFound(_) | SesPilotError::RemoteNotFound(_) => StatusCode::NOT_FOUND,
        SesPilotError::AlreadyExists(_) => StatusCode::CONFLICT,
        SesPilotError::InvalidInput(_) | SesPilotError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
