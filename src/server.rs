//! HTTP boundary for the fitness assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a fitness question (RAG or fallback) |
//! | `GET`  | `/` | Basic health check |
//! | `GET`  | `/health` | Health check; nudges a background re-initialize when not ready |
//! | `POST` | `/reset` | Tear down and rebuild the RAG pipeline |
//!
//! Validation failures return `400 { "detail": ... }` with the exact reason
//! string; unexpected failures return `500` with a generic detail. Reset is
//! the one operation whose failure is reported verbatim, as a 200
//! `{ "status": "error" }` body, since it is an operator action rather than
//! a user chat turn.
//!
//! CORS is fully permissive to support the browser chat UI, which is served
//! under `/static` when a static directory is configured.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::QueryCoordinator;
use crate::error::RagError;
use crate::orchestrator::RetrievalOrchestrator;

/// Shared application state, constructed once at process start and injected
/// into every handler. No global mutable state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    coordinator: Arc<QueryCoordinator>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        let orchestrator = Arc::new(RetrievalOrchestrator::new(config.clone()));
        let coordinator = Arc::new(QueryCoordinator::new(config.clone(), orchestrator));
        Self {
            config,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<QueryCoordinator> {
        &self.coordinator
    }

    pub fn orchestrator(&self) -> &Arc<RetrievalOrchestrator> {
        self.coordinator.orchestrator()
    }
}

/// Build the application router. Exposed separately from [`run_server`] so
/// tests can drive the HTTP contract without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/", get(handle_health))
        .route("/health", get(handle_detailed_health))
        .route("/chat", post(handle_chat))
        .route("/reset", post(handle_reset));

    if let Some(dir) = &state.config.server.static_dir {
        if dir.is_dir() {
            app = app.nest_service("/static", ServeDir::new(dir));
        } else {
            warn!(dir = %dir.display(), "static directory not found, UI not mounted");
        }
    }

    app.layer(cors).with_state(state)
}

/// Start the HTTP server.
///
/// The first `initialize()` runs in a spawned task so serving requests is
/// never blocked by corpus processing; until it completes, chat answers
/// come from the fallback responder.
pub async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config);

    let orchestrator = state.orchestrator().clone();
    tokio::spawn(async move {
        // Failure is logged by the orchestrator; the server keeps running
        // in fallback mode and an operator can POST /reset.
        let _ = orchestrator.initialize().await;
    });

    let app = build_router(state);
    info!(addr = %bind_addr, "GymPro server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Request/response bodies ============

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub is_gym_related: bool,
    pub sources: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub rag_enabled: bool,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub message: String,
}

// ============ Error response ============

/// Error that converts into the `{ "detail": ... }` HTTP body.
struct AppError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(detail: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        detail: detail.into(),
    }
}

fn internal_error() -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: "Internal server error".to_string(),
    }
}

// ============ POST /chat ============

/// Main chat endpoint. Validation failures are the only 4xx; every
/// pipeline failure has already been converted to fallback content by the
/// coordinator.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    match state.coordinator.handle(&request.message).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            response: outcome.response,
            is_gym_related: outcome.is_gym_related,
            sources: outcome.sources,
        })),
        Err(RagError::Validation(detail)) => Err(bad_request(detail)),
        Err(e) => {
            warn!(error = %e, "unexpected chat failure");
            Err(internal_error())
        }
    }
}

// ============ GET / and GET /health ============

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.orchestrator().status().await;
    Json(HealthResponse {
        status: status.health_label().to_string(),
        message: "GymPro RAG assistant is running".to_string(),
        rag_enabled: state.orchestrator().is_ready().await,
    })
}

/// Detailed health check. When the pipeline is not ready, a re-initialize
/// attempt is kicked off in the background; the response reflects the
/// current snapshot, not the attempt's outcome.
async fn handle_detailed_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = state.orchestrator();
    let status = orchestrator.status().await;
    let rag_enabled = orchestrator.is_ready().await;

    if !rag_enabled {
        info!("health check found RAG not ready, attempting re-initialization");
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let _ = orchestrator.initialize().await;
        });
    }

    let message = serde_json::to_string(&status)
        .map(|s| format!("System status: {}", s))
        .unwrap_or_else(|_| "System status unavailable".to_string());

    Json(HealthResponse {
        status: status.health_label().to_string(),
        message,
        rag_enabled,
    })
}

// ============ POST /reset ============

/// Reset and reinitialize the RAG pipeline. Blocks until the rebuild
/// finishes; the outcome is always a 200 with a success or error status.
async fn handle_reset(State(state): State<AppState>) -> Json<ResetResponse> {
    match state.orchestrator().reset().await {
        Ok(()) => Json(ResetResponse {
            status: "success".to_string(),
            message: "RAG system reset and reinitialized successfully".to_string(),
        }),
        Err(e) => {
            warn!(error = %e, "reset failed");
            Json(ResetResponse {
                status: "error".to_string(),
                message: "Failed to reinitialize RAG system".to_string(),
            })
        }
    }
}
