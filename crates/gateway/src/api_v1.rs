//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`               - Send a message, get the reply
//! - `POST /v1/chat/stream`        - Send a message, get an SSE stream of the turn
//! - `POST /v1/sessions`           - Create a session
//! - `GET  /v1/sessions/{id}`      - Get a session's history
//! - `GET  /v1/capabilities`       - List registered capabilities
//! - `GET  /v1/events`             - SSE stream of domain events

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use crate::SharedState;
use cinemate_agent::{AgentStreamEvent, NullSink};
use cinemate_core::error::Error;
use cinemate_core::event::DomainEvent;
use cinemate_core::message::{Conversation, SessionId};

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", get(get_session_handler))
        .route("/capabilities", get(list_capabilities_handler))
        .route("/events", get(event_stream_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing session ID (omit to start a new one).
    #[serde(default)]
    session_id: Option<String>,
    /// The user's message.
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
    generations: usize,
    calls_made: usize,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Serialize, Deserialize)]
struct SessionDetailResponse {
    id: String,
    messages: Vec<MessageDto>,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
struct MessageDto {
    id: String,
    role: String,
    content: String,
    timestamp: String,
}

#[derive(Serialize, Deserialize)]
struct CapabilityListResponse {
    capabilities: Vec<CapabilityDto>,
    count: usize,
}

#[derive(Serialize, Deserialize)]
struct CapabilityDto {
    name: String,
    description: String,
    parameters: Vec<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// A failed model call is the upstream's fault; anything else is ours.
fn turn_error(e: &Error) -> ApiError {
    let status = match e {
        Error::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

fn session_id_or_new(id: Option<String>) -> SessionId {
    id.filter(|s| !s.trim().is_empty())
        .map(SessionId)
        .unwrap_or_default()
}

// ── Chat ──────────────────────────────────────────────────────────────────

/// `POST /v1/chat`: Run one turn and return the visible reply.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message must not be empty"));
    }

    let session_id = session_id_or_new(payload.session_id);
    info!(session_id = %session_id, "v1/chat request");

    let handle = state
        .sessions
        .open_or_create(&session_id, &state.system_prompt)
        .await;
    let mut conv = handle.lock().await;

    let outcome = state
        .agent
        .run_turn(&mut conv, &payload.message, &NullSink)
        .await
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Turn failed");
            turn_error(&e)
        })?;

    Ok(Json(ChatResponse {
        session_id: session_id.to_string(),
        reply: outcome.reply,
        generations: outcome.generations,
        calls_made: outcome.calls_made,
    }))
}

// ── SSE Streaming ─────────────────────────────────────────────────────────

/// `POST /v1/chat/stream`: Run one turn, streaming its events as SSE.
///
/// The turn runs on its own task holding the session lock, so it finishes
/// and updates history even if the client disconnects.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message must not be empty"));
    }

    let session_id = session_id_or_new(payload.session_id);
    info!(session_id = %session_id, "v1/chat/stream SSE request");

    let handle = state
        .sessions
        .open_or_create(&session_id, &state.system_prompt)
        .await;
    let agent = state.agent.clone();
    let message = payload.message;

    let (tx, rx) = tokio::sync::mpsc::channel::<AgentStreamEvent>(64);
    tokio::spawn(async move {
        let mut conv = handle.lock().await;
        if let Err(e) = agent.run_turn(&mut conv, &message, &tx).await {
            debug!(session_id = %conv.id, error = %e, "Streamed turn failed");
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event.event_type()).data(data))
    });

    Ok(Sse::new(stream))
}

// ── Sessions ──────────────────────────────────────────────────────────────

/// `POST /v1/sessions`: Start a new session.
async fn create_session_handler(
    State(state): State<SharedState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = SessionId::new();
    state
        .sessions
        .open_or_create(&session_id, &state.system_prompt)
        .await;

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session_id.to_string(),
        }),
    )
}

/// `GET /v1/sessions/{id}`: A session's full history.
async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, StatusCode> {
    let conv = state
        .sessions
        .snapshot(&SessionId(id))
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(session_detail(&conv)))
}

fn session_detail(conv: &Conversation) -> SessionDetailResponse {
    SessionDetailResponse {
        id: conv.id.to_string(),
        messages: conv
            .messages()
            .iter()
            .map(|m| MessageDto {
                id: m.id.clone(),
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
                timestamp: m.timestamp.to_rfc3339(),
            })
            .collect(),
        created_at: conv.created_at.to_rfc3339(),
        updated_at: conv.updated_at.to_rfc3339(),
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────

async fn list_capabilities_handler(State(state): State<SharedState>) -> Json<CapabilityListResponse> {
    let capabilities: Vec<CapabilityDto> = state
        .capabilities
        .kinds()
        .into_iter()
        .filter_map(|kind| {
            let capability = state.capabilities.get(kind)?;
            Some(CapabilityDto {
                name: kind.wire_name().to_string(),
                description: capability.description().to_string(),
                parameters: kind.parameters().iter().map(|p| p.to_string()).collect(),
            })
        })
        .collect();

    Json(CapabilityListResponse {
        count: capabilities.len(),
        capabilities,
    })
}

// ── SSE Event Stream ──────────────────────────────────────────────────────

/// `GET /v1/events`: SSE stream of domain events from every session.
async fn event_stream_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.event_bus.subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            let event_name = match event.as_ref() {
                DomainEvent::TurnStarted { .. } => "turn_started",
                DomainEvent::ResponseGenerated { .. } => "response_generated",
                DomainEvent::CapabilityInvoked { .. } => "capability_invoked",
                DomainEvent::ReviewsPrefetched { .. } => "reviews_prefetched",
                DomainEvent::ReplyDelivered { .. } => "reply_delivered",
                DomainEvent::ErrorOccurred { .. } => "error_occurred",
            };
            Ok(SseEvent::default().event(event_name).data(data))
        });

    Sse::new(stream)
}
