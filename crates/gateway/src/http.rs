//! Thin axum ingress over the Session Manager, wiring the ingress
//! operations to HTTP so the crate is runnable. Routing, auth, and
//! transport concerns are deliberately minimal here — the orchestration
//! logic they front lives in [`crate::pipeline`] and `lumen-sessions`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lumen_domain::error::Error as DomainError;
use lumen_domain::model::{CalledFunction, CleanedTurn, EvaluationConfig, EvaluationStatus, MirroredCustomer, Turn};
use lumen_sessions::SessionManager;
use lumen_store::FileStore;

use crate::event_sink::{EventSink, TurnEventRecord};
use crate::pipeline::Pipeline;

pub struct AppState {
    pub manager: Arc<SessionManager<FileStore, FileStore>>,
    pub store: Arc<FileStore>,
    pub pipeline: Arc<Pipeline>,
    pub event_sink: Arc<dyn EventSink>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/evaluations", post(create_evaluation))
        .route("/evaluations/:evaluation_id", get(get_state))
        .route("/evaluations/:evaluation_id/stop", post(stop_evaluation))
        .route(
            "/evaluations/:evaluation_id/turns/:turn_id/process",
            post(process_turn),
        )
        .route("/turns", post(ingest_turn))
        .with_state(state)
}

struct ApiError(DomainError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Stopped(_) => (StatusCode::CONFLICT, "stopped"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            DomainError::UpstreamLlm(_) => (StatusCode::BAD_GATEWAY, "upstream_llm"),
            DomainError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = Json(serde_json::json!({ "error": code, "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Deserialize)]
struct CreateEvaluationRequest {
    conversation_id: String,
    config: EvaluationConfig,
    #[serde(default)]
    initial_customer: Option<MirroredCustomer>,
}

#[derive(Debug, Serialize)]
struct CreateEvaluationResponse {
    evaluation_id: String,
}

async fn create_evaluation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEvaluationRequest>,
) -> Result<Json<CreateEvaluationResponse>, ApiError> {
    let initial_customer = req
        .initial_customer
        .unwrap_or_else(|| MirroredCustomer::new_at(chrono::Utc::now()));
    let evaluation_id =
        state
            .manager
            .create_evaluation(&req.conversation_id, req.config, initial_customer)?;
    Ok(Json(CreateEvaluationResponse { evaluation_id }))
}

#[derive(Debug, Serialize)]
struct TurnOutcomeResponse {
    cleaned_turn: CleanedTurn,
    called_functions: Vec<CalledFunction>,
    total_cost_usd: f64,
    total_processing_time_ms: u64,
}

async fn process_turn(
    State(state): State<Arc<AppState>>,
    Path((evaluation_id, turn_id)): Path<(String, String)>,
) -> Result<Json<TurnOutcomeResponse>, ApiError> {
    let outcome = state
        .manager
        .process_turn(&evaluation_id, &turn_id, state.pipeline.as_ref())
        .await?;

    // Publish only reachable here: `process_turn` returns `Ok` only after
    // `commit_turn` has already succeeded, so the sink never fires ahead of
    // persistence.
    let record = TurnEventRecord {
        evaluation_id: evaluation_id.clone(),
        turn_id: turn_id.clone(),
        cleaned_turn: outcome.cleaned_turn.clone(),
        called_functions: outcome.called_functions.clone(),
        total_cost_usd: outcome.total_cost_usd,
        total_processing_time_ms: outcome.total_processing_time_ms,
        timestamp: chrono::Utc::now(),
    };
    state.event_sink.publish(record).await;

    Ok(Json(TurnOutcomeResponse {
        cleaned_turn: outcome.cleaned_turn,
        called_functions: outcome.called_functions,
        total_cost_usd: outcome.total_cost_usd,
        total_processing_time_ms: outcome.total_processing_time_ms,
    }))
}

async fn stop_evaluation(
    State(state): State<Arc<AppState>>,
    Path(evaluation_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.manager.stop_evaluation(&evaluation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct StateSnapshotResponse {
    evaluation_id: String,
    status: EvaluationStatus,
    cleaned_turn_count: usize,
    function_call_count: usize,
    last_access: chrono::DateTime<chrono::Utc>,
}

async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(evaluation_id): Path<String>,
) -> Result<Json<StateSnapshotResponse>, ApiError> {
    let snapshot = state
        .manager
        .get_state(&evaluation_id)
        .await
        .ok_or_else(|| ApiError(DomainError::NotFound(format!("evaluation {evaluation_id}"))))?;
    Ok(Json(StateSnapshotResponse {
        evaluation_id: snapshot.evaluation_id,
        status: snapshot.status,
        cleaned_turn_count: snapshot.cleaned_turn_count,
        function_call_count: snapshot.function_call_count,
        last_access: snapshot.last_access,
    }))
}

/// Non-normative convenience route: stage a raw Turn so a later
/// `process_turn` call can resolve it through `TurnSource`. Real deployments
/// feed `Turn`s in from wherever the STT pipeline lands them; this exists
/// only so the binary is runnable end to end without a second process.
async fn ingest_turn(
    State(state): State<Arc<AppState>>,
    Json(turn): Json<Turn>,
) -> Result<StatusCode, ApiError> {
    state.store.ingest_turn(&turn)?;
    Ok(StatusCode::CREATED)
}
