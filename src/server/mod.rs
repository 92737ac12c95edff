//! HTTP surface
//!
//! One pipeline endpoint plus a small health/echo pair used by deployment
//! checks. Request bodies are read raw so empty-body and malformed-JSON
//! cases produce the exact error payloads callers rely on.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::{GeminiClient, TextGenerator};
use crate::pipeline::{GenerationRequest, Pipeline};
use crate::sandbox::{DaytonaClient, SandboxProvider};

// ---- App State ----

/// Shared state for all routes
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration; credentials are validated per request
    pub config: Arc<Config>,
    /// Generative model seam
    pub model: Arc<dyn TextGenerator>,
    /// Sandbox provider seam
    pub provider: Arc<dyn SandboxProvider>,
}

impl AppState {
    /// Build state with real provider clients from configuration.
    ///
    /// Client construction makes no remote calls, so this succeeds even when
    /// credentials are absent; requests then report the missing credential.
    pub fn from_config(config: Config) -> Result<Self> {
        let model = GeminiClient::new(config.model.clone())?;
        let provider = DaytonaClient::new(config.sandbox.clone())?;
        Ok(AppState {
            config: Arc::new(config),
            model: Arc::new(model),
            provider: Arc::new(provider),
        })
    }
}

// ---- Error Handling ----

/// Response wrapper mapping failures to status classes.
///
/// Request-shape errors carry their message verbatim (callers match on the
/// exact strings); pipeline errors render through the error taxonomy.
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    /// A 400 with an exact message
    fn bad_request(message: impl Into<String>) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        AppError {
            status,
            message: err.to_string(),
        }
    }
}

// ---- Routes ----

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-video", post(generate_video))
        .route("/health", get(health))
        .route("/echo", post(echo))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse a raw body, distinguishing empty from malformed
fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> std::result::Result<T, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("Empty request body"));
    }
    serde_json::from_slice(body).map_err(|_| AppError::bad_request("Invalid JSON payload"))
}

/// `POST /generate-video` — run the full pipeline and return the MP4
async fn generate_video(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Response, AppError> {
    let request: GenerationRequest = parse_body(&body)?;

    if request.latex.is_empty() {
        return Err(AppError::bad_request("Missing required field: latex"));
    }
    if request.explanations.is_empty() {
        return Err(AppError::bad_request(
            "Missing required field: explanations",
        ));
    }

    // Credentials are checked before any remote call is made.
    state.config.validate()?;

    let pipeline = Pipeline::new(
        state.model.clone(),
        state.provider.clone(),
        Duration::from_secs(state.config.sandbox.exec_timeout_secs),
    );

    // The run executes as its own task: a client that disconnects early
    // drops this handler future, but the spawned run keeps going and its
    // cleanup step still destroys the sandbox.
    let run = tokio::spawn(async move { pipeline.run(&request).await });

    let artifact = run
        .await
        .map_err(|e| {
            error!(error = %e, "Pipeline task failed");
            AppError::from(Error::Internal(format!("pipeline task failed: {}", e)))
        })?
        .map_err(|e| {
            error!(error = %e, "Pipeline run failed");
            AppError::from(e)
        })?;

    info!(
        bytes = artifact.bytes.len(),
        source = %artifact.source_path,
        "Pipeline run succeeded"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "video/mp4")],
        artifact.bytes,
    )
        .into_response())
}

/// `GET /health` — fixed status payload for deployment checks
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": format!("{} {} is running", crate::NAME, crate::VERSION),
    }))
}

/// Echo request body
#[derive(Debug, Deserialize)]
struct EchoRequest {
    #[serde(default)]
    expression: String,
}

/// Echo response body
#[derive(Debug, Serialize)]
struct EchoResponse {
    received: String,
    length: usize,
}

/// `POST /echo` — echo a field back, for quick connectivity tests
async fn echo(body: Bytes) -> std::result::Result<Json<EchoResponse>, AppError> {
    let request: EchoRequest = parse_body(&body)?;
    Ok(Json(EchoResponse {
        length: request.expression.len(),
        received: request.expression,
    }))
}
