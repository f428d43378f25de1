//! HTTP request handlers

use super::types::{
    CardsResponse, CreateSessionResponse, ErrorResponse, FollowUpRequest, FollowUpResponse,
    GenerateRequest, GenerateResponse, HealthResponse, ProvidersResponse, SessionFollowUpRequest,
    SessionFollowUpResponse, SessionGenerateRequest, SessionGenerateResponse, SessionResponse,
};
use super::AppState;
use crate::conversation::StateError;
use crate::error::CardError;
use crate::llm::LlmErrorKind;
use crate::session::Session;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/providers", get(list_providers))
        // Stateless operations
        .route("/v1/generate", post(generate))
        .route("/v1/followup", post(follow_up))
        // Server-held conversations
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/generate", post(session_generate))
        .route("/api/sessions/:id/followup", post(session_follow_up))
        .route("/api/sessions/:id/next", post(session_next))
        .route("/api/sessions/:id/back", post(session_back))
        .route("/api/sessions/:id/cards", get(session_cards))
        .with_state(state)
}

// ============================================================
// Probes and metadata
// ============================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let registry = state.engine.registry();
    Json(ProvidersResponse {
        default_provider: registry.default_provider().name(),
        providers: registry.providers_info(),
    })
}

// ============================================================
// Stateless operations
// ============================================================

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(req) = payload?;
    let outcome = state.engine.generate(&req).await?;

    Ok(Json(GenerateResponse {
        cards: outcome.deck.into_cards(),
        usage: outcome.usage,
        raw_text: outcome.raw_text,
        meta: outcome.meta,
    }))
}

async fn follow_up(
    State(state): State<AppState>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<FollowUpResponse>, AppError> {
    let Json(req) = payload?;
    let outcome = state.engine.follow_up(&req).await?;

    Ok(Json(FollowUpResponse {
        card: outcome.card,
        usage: outcome.usage,
        raw_text: outcome.raw_text,
        meta: outcome.meta,
    }))
}

// ============================================================
// Sessions
// ============================================================

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or(AppError::SessionNotFound(id))
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id(),
            created_at: session.created_at(),
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(SessionResponse {
        session_id: id,
        view: session.view().await,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(id))
    }
}

async fn session_generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SessionGenerateRequest>, JsonRejection>,
) -> Result<Json<SessionGenerateResponse>, AppError> {
    let Json(req) = payload?;
    let session = find_session(&state, id).await?;
    let generated = session.generate(&req.prompt, &req.options).await?;
    let outcome = generated.outcome;

    Ok(Json(SessionGenerateResponse {
        sequence_id: generated.sequence_id,
        cards: outcome.deck.into_cards(),
        usage: outcome.usage,
        raw_text: outcome.raw_text,
        meta: outcome.meta,
        view: session.view().await,
    }))
}

async fn session_follow_up(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SessionFollowUpRequest>, JsonRejection>,
) -> Result<Json<SessionFollowUpResponse>, AppError> {
    let Json(req) = payload?;
    let session = find_session(&state, id).await?;
    let answered = session.follow_up(&req.question, &req.options).await?;

    Ok(Json(SessionFollowUpResponse {
        follow_up: answered.follow_up,
        usage: answered.outcome.usage,
        raw_text: answered.outcome.raw_text,
        meta: answered.outcome.meta,
        view: session.view().await,
    }))
}

async fn session_next(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(SessionResponse {
        session_id: id,
        view: session.next().await,
    }))
}

async fn session_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(SessionResponse {
        session_id: id,
        view: session.back().await,
    }))
}

async fn session_cards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CardsResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(CardsResponse {
        cards: session.view_all().await,
        view: session.view().await,
    }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Card(CardError),
    SessionNotFound(Uuid),
}

impl From<CardError> for AppError {
    fn from(e: CardError) -> Self {
        AppError::Card(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Card(CardError::validation(rejection.body_text()))
    }
}

fn card_error_parts(error: &CardError) -> (StatusCode, serde_json::Value) {
    match error {
        CardError::Validation(_) => (StatusCode::BAD_REQUEST, json!({})),
        CardError::Parse(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "reason": e.reason.to_string(), "snippet": e.snippet }),
        ),
        CardError::State(StateError::StaleContext { requested, active }) => (
            StatusCode::CONFLICT,
            json!({ "requested": requested, "active": active }),
        ),
        CardError::State(StateError::NoActiveCard) => (StatusCode::CONFLICT, json!({})),
        CardError::Provider(e) => {
            let status = if e.kind == LlmErrorKind::RateLimit {
                StatusCode::TOO_MANY_REQUESTS
            } else {
                StatusCode::BAD_GATEWAY
            };
            (
                status,
                json!({
                    "kind": e.kind.as_str(),
                    "upstream_status": e.status,
                    "retryable": e.kind.is_retryable(),
                    "retry_after_secs": e.retry_after.map(|d| d.as_secs()),
                }),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Card(error) => {
                let (status, meta) = card_error_parts(&error);
                (
                    status,
                    ErrorResponse {
                        detail: error.to_string(),
                        error_type: error.error_type(),
                        meta,
                    },
                )
            }
            AppError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    detail: format!("session {id} not found"),
                    error_type: "not_found",
                    meta: json!({ "session_id": id }),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
