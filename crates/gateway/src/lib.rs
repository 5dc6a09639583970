//! HTTP gateway for Cinemate.
//!
//! Exposes a health check and the v1 chat API. Every session keeps its own
//! conversation history in a [`SessionStore`]; a turn holds the session's
//! lock for its whole duration.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use cinemate_agent::AgentLoop;
use cinemate_core::capability::CapabilityRegistry;
use cinemate_core::event::EventBus;
use cinemate_core::provider::Provider;
use cinemate_core::session::SessionStore;
use cinemate_movies::{BookingLedger, MovieCatalog};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
    pub sessions: Arc<SessionStore>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub event_bus: Arc<EventBus>,
    /// First message of every new session
    pub system_prompt: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire the catalog, capabilities and agent loop for `config` around
    /// `provider`.
    pub fn from_config(config: &cinemate_config::AppConfig, provider: Arc<dyn Provider>) -> Self {
        let with_confirmation = config.agent.require_purchase_confirmation;
        let capabilities = Arc::new(cinemate_movies::default_registry(
            Arc::new(MovieCatalog::default()),
            Arc::new(BookingLedger::new()),
            with_confirmation,
        ));
        let event_bus = Arc::new(EventBus::default());
        let agent = Arc::new(AgentLoop::from_config(
            config,
            provider,
            capabilities.clone(),
            event_bus.clone(),
        ));

        Self {
            agent,
            sessions: Arc::new(SessionStore::new(config.gateway.max_sessions)),
            capabilities,
            event_bus,
            system_prompt: cinemate_agent::prompts::system_prompt(&config.agent),
            start_time: chrono::Utc::now(),
        }
    }
}

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: cinemate_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = cinemate_providers::build_from_config(&config).default_provider()?;
    let state = Arc::new(GatewayState::from_config(&config, provider));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
