//! HTTP surface for the debate engine.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use debatecoach_core::rubric::{RoundRubric, full_rubric};
use debatecoach_core::{
    DebateError, DebateLogger, DebateOrchestrator, ErrorKind, Round, Session, Side,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<DebateOrchestrator>,
    logger: Arc<dyn DebateLogger>,
}

impl AppState {
    pub fn new(orchestrator: DebateOrchestrator, logger: Arc<dyn DebateLogger>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            logger,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/debate/rubric", get(rubric))
        .route("/api/topic/validate", post(validate_topic))
        .route("/api/debate/sessions", post(create_session))
        .route("/api/debate/sessions/{id}", get(get_session))
        .route("/api/debate/sessions/{id}/rounds", post(submit_round))
        .route("/api/debate/sessions/{id}/ai-response", get(get_ai_response))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    state.logger.log_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_millis(),
    );
    response
}

/// Failure body: `{ "success": false, "message": "..." }`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

#[derive(Debug)]
pub struct ApiError(DebateError);

impl From<DebateError> for ApiError {
    fn from(err: DebateError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DebateError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::External => StatusCode::BAD_GATEWAY,
            ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            success: false,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    ai_configured: bool,
    word_cap: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ai_configured: state.orchestrator.ai().is_configured(),
        word_cap: state.orchestrator.word_cap(),
    })
}

#[derive(Debug, Serialize)]
struct RubricResponse {
    success: bool,
    rounds: Vec<RoundRubric>,
}

async fn rubric() -> Json<RubricResponse> {
    Json(RubricResponse {
        success: true,
        rounds: full_rubric(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct TopicRequest {
    #[serde(default)]
    topic: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TopicResponse {
    success: bool,
    is_valid: bool,
    refined_topic: String,
    reason: String,
    fallback: bool,
}

async fn validate_topic(
    State(state): State<AppState>,
    payload: Result<Json<TopicRequest>, JsonRejection>,
) -> ApiResult<TopicResponse> {
    let Json(req) = payload?;
    let outcome = state.orchestrator.validate_topic(&req.topic).await?;
    let fallback = outcome.is_fallback();
    Ok(Json(TopicResponse {
        success: true,
        is_valid: outcome.value.is_valid,
        refined_topic: outcome.value.refined_topic,
        reason: outcome.value.reason,
        fallback,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    refined_topic: Option<String>,
    #[serde(default)]
    side: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    success: bool,
    session: Session,
}

async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<SessionResponse> {
    let Json(req) = payload?;
    let side: Side = req.side.parse()?;
    let session = state
        .orchestrator
        .create_session(&req.topic, req.refined_topic.as_deref(), side)
        .await?;
    Ok(Json(SessionResponse {
        success: true,
        session,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.orchestrator.get_session(&id).await?;
    Ok(Json(SessionResponse {
        success: true,
        session,
    }))
}

async fn get_ai_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.orchestrator.get_ai_response(&id).await?;
    Ok(Json(SessionResponse {
        success: true,
        session,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    success: bool,
    round: Round,
    session: Session,
}

async fn submit_round(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<SubmitResponse> {
    let Json(req) = payload?;
    let outcome = state.orchestrator.submit_round(&id, &req.response).await?;
    Ok(Json(SubmitResponse {
        success: true,
        round: outcome.round,
        session: outcome.session,
    }))
}
