//! HTTP API: policy generation and export.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{ExportFailure, PolicyError};
use crate::export::{export_policies, ExportOptions, ExportRequest};
use crate::generate::{generate_policy_set, PolicyGenerator, PolicyRequest};
use crate::policy::PolicySet;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn PolicyGenerator>,
}

impl AppState {
    pub fn new(generator: Arc<dyn PolicyGenerator>) -> Self {
        Self { generator }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for PolicyError {
    fn into_response(self) -> Response {
        let status = match &self {
            PolicyError::Validation(_) => StatusCode::BAD_REQUEST,
            PolicyError::Generation(_) | PolicyError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/generate-policies", post(generate_policies))
        .route("/api/export-policies", post(export_archive))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("policy-forge listening on http://{}", addr);
    axum::serve(listener, router(state)).await
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "policy-forge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn rejected(rejection: JsonRejection) -> PolicyError {
    log::warn!("rejected request body: {}", rejection.body_text());
    PolicyError::Validation("Missing required fields".into())
}

async fn generate_policies(
    State(state): State<AppState>,
    payload: Result<Json<PolicyRequest>, JsonRejection>,
) -> Result<Json<PolicySet>, PolicyError> {
    let Json(request) = payload.map_err(rejected)?;
    let form = request.validate().map_err(PolicyError::logged)?;
    let policies = generate_policy_set(state.generator.clone(), &form)
        .await
        .map_err(PolicyError::logged)?;
    Ok(Json(policies))
}

async fn export_archive(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, PolicyError> {
    let Json(request) = payload.map_err(rejected)?;
    let (policies, org, framework, mode) = request.validate().map_err(PolicyError::logged)?;
    let options = ExportOptions {
        mode,
        ..ExportOptions::default()
    };

    let archive = tokio::task::spawn_blocking(move || {
        export_policies(&policies, &org, framework, &options)
    })
    .await
    .map_err(|e| PolicyError::Export(ExportFailure::Task(e)).logged())??;

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.bytes,
    )
        .into_response())
}
