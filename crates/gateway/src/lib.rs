//! HTTP API gateway for lintel.
//!
//! Endpoints:
//!
//! - `POST /query`             — standard path
//! - `POST /query-agentic`     — agentic path (adds `reasoning_steps`)
//! - `GET  /knowledge-summary` — current artifact or fallback; never 5xx
//! - `GET  /health`            — liveness + vector-index reachability
//!
//! Authentication is handled upstream; the core trusts the caller's
//! identity only to the extent of logging. Built on Axum.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;

use lintel_agent::{AnswerError, AnswerRequest, Mode, Orchestrator};
use lintel_config::AppConfig;
use lintel_core::drawing::Drawing;
use lintel_retrieval::RetrievalGateway;
use lintel_summary::KnowledgeSummaryService;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub retrieval: Arc<RetrievalGateway>,
}

pub type SharedState = Arc<AppState>;

/// Build the router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/query-agentic", post(query_agentic_handler))
        .route("/knowledge-summary", get(knowledge_summary_handler))
        .route("/health", get(health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire up all subsystems from config and start serving.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let provider = lintel_providers::build_from_config(&config.llm);
    let retrieval = Arc::new(RetrievalGateway::new(&config.retrieval));
    let summary = Arc::new(KnowledgeSummaryService::new(
        &config.summary,
        &config.llm,
        provider.clone(),
    ));
    let registry = lintel_tools::registry(retrieval.clone(), provider.clone(), &config.llm);

    let orchestrator = Orchestrator::new(
        provider,
        retrieval.clone(),
        registry,
        summary,
        &config,
    );

    let state = Arc::new(AppState {
        orchestrator,
        retrieval,
    });

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(%addr, "gateway listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
struct QueryBody {
    question: String,
    #[serde(default)]
    drawing: Option<Drawing>,
    #[serde(default)]
    drawing_updated_at: Option<String>,
    #[serde(default)]
    top_k: Option<usize>,
}

// --- Handlers ---

type ApiResponse = (StatusCode, Json<serde_json::Value>);

async fn query_handler(
    State(state): State<SharedState>,
    body: Json<serde_json::Value>,
) -> ApiResponse {
    run_query(state, body.0, Mode::Standard).await
}

async fn query_agentic_handler(
    State(state): State<SharedState>,
    body: Json<serde_json::Value>,
) -> ApiResponse {
    run_query(state, body.0, Mode::Agentic).await
}

async fn run_query(state: SharedState, body: serde_json::Value, mode: Mode) -> ApiResponse {
    // Manual parse so validation failures yield 400, not a framework
    // rejection.
    let body: QueryBody = match serde_json::from_value(body) {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid body: {e}")),
    };

    let request = AnswerRequest {
        question: body.question,
        drawing: body.drawing,
        drawing_updated_at: body.drawing_updated_at,
        mode,
        turns: Vec::new(),
        top_k: body.top_k,
    };

    match state.orchestrator.answer(request).await {
        Ok(result) => {
            let payload = serde_json::to_value(&result)
                .unwrap_or_else(|_| serde_json::json!({ "error": "serialization failure" }));
            (StatusCode::OK, Json(payload))
        }
        Err(e @ (AnswerError::InvalidQuestion | AnswerError::QuestionTooLong { .. })) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(AnswerError::Timeout { partial_trace }) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(serde_json::json!({
                "error": "request deadline elapsed",
                "reasoning_steps": partial_trace,
            })),
        ),
    }
}

/// Never fails: serves the artifact or the hard-coded fallback.
async fn knowledge_summary_handler(State(state): State<SharedState>) -> ApiResponse {
    let summary = state.orchestrator.knowledge_summary();
    let payload = serde_json::to_value(&summary)
        .unwrap_or_else(|_| serde_json::json!({ "overview": "", "topics": [], "suggested_questions": [] }));
    (StatusCode::OK, Json(payload))
}

async fn health_handler(State(state): State<SharedState>) -> ApiResponse {
    let probe = state.retrieval.probe().await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "retrieval_reachable": probe.reachable,
            "index_non_empty": probe.index_non_empty,
        })),
    )
}

fn error_response(status: StatusCode, message: String) -> ApiResponse {
    (status, Json(serde_json::json!({ "error": message })))
}
