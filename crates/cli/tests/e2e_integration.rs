//! End-to-end integration tests for Cinemate.
//!
//! These tests wire the real movie capabilities, fetch decider and agent loop
//! against scripted providers, and drive the gateway router without a server.

use std::sync::Arc;

use cinemate_agent::{AgentLoop, AgentStreamEvent, GenerationSettings, NullSink};
use cinemate_config::AppConfig;
use cinemate_core::error::{Error, ProviderError};
use cinemate_core::event::{DomainEvent, EventBus};
use cinemate_core::message::{Conversation, Message, Role, SessionId};
use cinemate_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use cinemate_movies::{BookingLedger, MovieCatalog, default_registry};

// ── Mock Provider ────────────────────────────────────────────────────────

enum Step {
    Text(String),
    Fail,
}

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    steps: std::sync::Mutex<Vec<Step>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self::from_steps(responses.iter().map(|r| Step::Text(r.to_string())).collect())
    }

    /// The first call fails with a network error, the rest follow `responses`.
    fn failing_then(responses: &[&str]) -> Self {
        let mut steps = vec![Step::Fail];
        steps.extend(responses.iter().map(|r| Step::Text(r.to_string())));
        Self::from_steps(steps)
    }

    fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps: std::sync::Mutex::new(steps),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let mut steps = self.steps.lock().unwrap();
        if steps.is_empty() {
            panic!("ScriptedProvider exhausted at call #{call}");
        }
        match steps.remove(0) {
            Step::Text(text) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock".into(),
            }),
            Step::Fail => Err(ProviderError::Network("connection reset".into())),
        }
    }
}

const NO_FETCH: &str =
    r#"{"subject":"showtimes","subject_id":null,"should_fetch":false,"rationale":"not about reviews"}"#;

struct Harness {
    agent: AgentLoop,
    provider: Arc<ScriptedProvider>,
    ledger: Arc<BookingLedger>,
    catalog: Arc<MovieCatalog>,
    conv: Conversation,
}

fn harness(responses: &[&str], config: &AppConfig) -> Harness {
    harness_with(Arc::new(ScriptedProvider::new(responses)), config)
}

fn harness_with(provider: Arc<ScriptedProvider>, config: &AppConfig) -> Harness {
    let catalog = Arc::new(MovieCatalog::default());
    let ledger = Arc::new(BookingLedger::new());
    let registry = Arc::new(default_registry(
        catalog.clone(),
        ledger.clone(),
        config.agent.require_purchase_confirmation,
    ));
    let agent = AgentLoop::from_config(
        config,
        provider.clone(),
        registry,
        Arc::new(EventBus::default()),
    );
    let conv = Conversation::start(
        SessionId::new(),
        cinemate_agent::prompts::system_prompt(&config.agent),
    );
    Harness {
        agent,
        provider,
        ledger,
        catalog,
        conv,
    }
}

fn roles(conv: &Conversation) -> Vec<Role> {
    conv.messages().iter().map(|m| m.role).collect()
}

// ── E2E: Showtimes Scenario ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_whats_playing_near_zip() {
    let mut h = harness(
        &[
            NO_FETCH,
            r#"{"function_name":"get_showtimes","arguments":{"title":"","location":"10001"}}"#,
            "Here's what's playing near 10001 tonight.",
        ],
        &AppConfig::default(),
    );

    let outcome = h
        .agent
        .run_turn(&mut h.conv, "What's playing near 10001?", &NullSink)
        .await
        .expect("Turn should succeed");

    assert_eq!(outcome.reply, "Here's what's playing near 10001 tonight.");
    assert_eq!(outcome.calls_made, 1);
    assert_eq!(
        roles(&h.conv),
        [Role::System, Role::User, Role::System, Role::Assistant]
    );

    let result = &h.conv.messages()[2].content;
    assert!(result.starts_with("Showtimes near 10001:"), "got {result}");
    for theater in h.catalog.theaters_near("10001") {
        assert!(result.contains(theater));
    }
    // The raw call never lands in history; only the system prompt describes the format
    assert!(
        h.conv.messages()[1..]
            .iter()
            .all(|m| !m.content.contains("function_name"))
    );

    // Decision call, then two generations of the loop
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(h.provider.request(0).messages.len(), 2);
    assert_eq!(h.provider.request(2).messages.len(), 3);
}

#[tokio::test]
async fn e2e_generation_settings_from_config() {
    let mut h = harness(&[NO_FETCH, "Hi there!"], &AppConfig::default());
    h.agent.run_turn(&mut h.conv, "Hello", &NullSink).await.unwrap();

    let request = h.provider.request(1);
    let defaults = GenerationSettings::default();
    assert_eq!(request.model, defaults.model);
    assert_eq!(request.temperature, 0.2);
    assert_eq!(request.max_tokens, Some(500));
    assert!(request.stream);
}

// ── E2E: Proactive Review Fetch ──────────────────────────────────────────

#[tokio::test]
async fn e2e_decider_prefetches_reviews() {
    let mut h = harness(
        &[
            r#"{"subject":"Dune: Part Two","subject_id":693134,"should_fetch":true,"rationale":"user asks about quality"}"#,
            "Critics were impressed by Dune: Part Two.",
        ],
        &AppConfig::default(),
    );

    let outcome = h
        .agent
        .run_turn(&mut h.conv, "Is Dune: Part Two any good?", &NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.calls_made, 0);
    assert_eq!(
        roles(&h.conv),
        [Role::System, Role::User, Role::System, Role::Assistant]
    );
    assert!(h.conv.messages()[2].content.starts_with("Reviews for Dune: Part Two:"));
}

#[tokio::test]
async fn e2e_decider_garbage_is_ignored() {
    let mut h = harness(&["sure, fetch them", "Happy to help."], &AppConfig::default());
    h.agent.run_turn(&mut h.conv, "Hi", &NullSink).await.unwrap();
    assert_eq!(roles(&h.conv), [Role::System, Role::User, Role::Assistant]);
}

// ── E2E: Unknown Functions and the Call Cap ──────────────────────────────

#[tokio::test]
async fn e2e_unknown_function_is_folded_back() {
    let mut h = harness(
        &[
            NO_FETCH,
            r#"{"function_name":"get_popcorn_prices","arguments":{"size":"large"}}"#,
            "I can't check popcorn prices, sorry.",
        ],
        &AppConfig::default(),
    );

    h.agent
        .run_turn(&mut h.conv, "How much is popcorn?", &NullSink)
        .await
        .unwrap();
    assert_eq!(
        h.conv.messages()[2].content,
        "Unknown function: get_popcorn_prices"
    );
    assert!(h.ledger.is_empty());
    assert!(h.conv.metadata.is_empty());
}

#[tokio::test]
async fn e2e_call_cap_delivers_fallback() {
    let mut config = AppConfig::default();
    config.agent.proactive_fetch = false;
    config.agent.max_calls_per_turn = 2;

    let call = r#"{"function_name":"get_now_playing_movies","arguments":""}"#;
    let mut h = harness(&[call, call, call], &config);

    let outcome = h.agent.run_turn(&mut h.conv, "What's on?", &NullSink).await.unwrap();
    assert!(outcome.hit_call_limit);
    assert_eq!(outcome.calls_made, 2);
    assert_eq!(h.conv.last().map(|m| m.role), Some(Role::Assistant));
    assert_eq!(h.conv.last().map(|m| m.content.as_str()), Some(outcome.reply.as_str()));
}

// ── E2E: Ticket Purchases ────────────────────────────────────────────────

fn order_json(catalog: &MovieCatalog) -> serde_json::Value {
    let movie = catalog
        .find_by_title("Twisters")
        .expect("Twisters is in the catalog");
    let theater = catalog.theaters_near("10001")[0];
    let showtime = catalog.showtimes(movie, theater)[0];
    serde_json::json!({
        "theater": theater,
        "movie": movie.title,
        "showtime": showtime,
    })
}

fn call(name: &str, arguments: &serde_json::Value) -> String {
    serde_json::json!({ "function_name": name, "arguments": arguments }).to_string()
}

#[tokio::test]
async fn e2e_advisory_purchase_records_booking() {
    let mut config = AppConfig::default();
    config.agent.proactive_fetch = false;

    let order = order_json(&MovieCatalog::default());
    let buy = call("buy_ticket", &order);
    let mut h = harness(&[&buy, "You're all set!"], &config);

    h.agent
        .run_turn(&mut h.conv, "Buy me a ticket for Twisters", &NullSink)
        .await
        .unwrap();

    assert_eq!(h.ledger.len(), 1);
    let result = &h.conv.messages()[2].content;
    assert!(result.starts_with("Ticket purchased for Twisters"), "got {result}");
}

#[tokio::test]
async fn e2e_confirmation_gate_blocks_then_allows_purchase() {
    let mut config = AppConfig::default();
    config.agent.proactive_fetch = false;
    config.agent.require_purchase_confirmation = true;

    let order = order_json(&MovieCatalog::default());
    let buy = call("buy_ticket", &order);
    let confirm = call("confirm_ticket_purchase", &order);
    let mut h = harness(
        &[
            // Turn 1: buys without confirming and is refused
            &buy,
            "Let me confirm the order first.",
            // Turn 2: confirms, then asks the user
            &confirm,
            "One ticket for Twisters. Shall I buy it?",
            // Turn 3: the user agreed
            &buy,
            "Done! Enjoy the movie.",
        ],
        &config,
    );
    assert!(h.conv.messages()[0].content.contains("confirm_ticket_purchase"));

    h.agent.run_turn(&mut h.conv, "Buy Twisters", &NullSink).await.unwrap();
    assert!(h.ledger.is_empty());
    assert!(h.conv.messages()[2].content.starts_with("Purchase not made"));

    h.agent.run_turn(&mut h.conv, "Ok, confirm it", &NullSink).await.unwrap();
    assert!(h.ledger.is_empty());
    assert!(h.conv.messages()[5].content.starts_with("Pending order"));

    h.agent.run_turn(&mut h.conv, "Yes", &NullSink).await.unwrap();
    assert_eq!(h.ledger.len(), 1);
    assert!(h.conv.messages()[8].content.starts_with("Ticket purchased"));
}

// ── E2E: Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_provider_failure_then_recovery() {
    let mut config = AppConfig::default();
    config.agent.proactive_fetch = false;
    let mut h = harness_with(
        Arc::new(ScriptedProvider::failing_then(&["Back online. How can I help?"])),
        &config,
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<AgentStreamEvent>(16);
    let err = h.agent.run_turn(&mut h.conv, "Hi", &tx).await.unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
    drop(tx);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(events.as_slice(), [AgentStreamEvent::Error { .. }]));

    // Same session keeps working on the next turn
    let outcome = h.agent.run_turn(&mut h.conv, "Hi again", &NullSink).await.unwrap();
    assert_eq!(outcome.reply, "Back online. How can I help?");
    assert_eq!(
        roles(&h.conv),
        [Role::System, Role::User, Role::User, Role::Assistant]
    );
}

// ── E2E: Event System ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_turn_publishes_domain_events() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let provider = Arc::new(ScriptedProvider::new(&[
        r#"{"function_name":"get_now_playing_movies","arguments":{}}"#,
        "Six movies are playing.",
    ]));
    let registry = Arc::new(default_registry(
        Arc::new(MovieCatalog::default()),
        Arc::new(BookingLedger::new()),
        false,
    ));
    let agent = AgentLoop::new(provider, GenerationSettings::default(), registry, bus);
    let mut conv = Conversation::start(SessionId::from("events"), "system prompt");

    agent.run_turn(&mut conv, "What's on?", &NullSink).await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(match event.as_ref() {
            DomainEvent::TurnStarted { .. } => "turn_started",
            DomainEvent::ResponseGenerated { .. } => "response_generated",
            DomainEvent::CapabilityInvoked { .. } => "capability_invoked",
            DomainEvent::ReviewsPrefetched { .. } => "reviews_prefetched",
            DomainEvent::ReplyDelivered { .. } => "reply_delivered",
            DomainEvent::ErrorOccurred { .. } => "error_occurred",
        });
    }
    assert_eq!(
        names,
        [
            "turn_started",
            "response_generated",
            "capability_invoked",
            "response_generated",
            "reply_delivered",
        ]
    );
}

// ── E2E: Configuration System ────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_file_drives_agent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_model = "gpt-4o-mini"

[agent]
max_calls_per_turn = 1
proactive_fetch = false
require_purchase_confirmation = true
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.default_max_tokens, 500);

    let call = r#"{"function_name":"get_now_playing_movies","arguments":{}}"#;
    let mut h = harness(&[call, call], &config);
    let outcome = h.agent.run_turn(&mut h.conv, "What's on?", &NullSink).await.unwrap();

    assert!(outcome.hit_call_limit);
    assert_eq!(h.provider.request(0).model, "gpt-4o-mini");
    assert!(h.conv.messages()[0].content.contains("confirm_ticket_purchase"));
}

// ── E2E: Gateway API (router only, no server) ────────────────────────────

#[tokio::test]
async fn e2e_gateway_chat_round_trip() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let mut config = AppConfig::default();
    config.agent.proactive_fetch = false;
    let provider = Arc::new(ScriptedProvider::new(&[
        r#"{"function_name":"get_showtimes","arguments":{"title":"","location":"10001"}}"#,
        "Lots of options near 10001.",
    ]));
    let state = Arc::new(cinemate_gateway::GatewayState::from_config(&config, provider));
    let app = cinemate_gateway::build_router(state.clone());

    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "session_id": "e2e", "message": "What's playing near 10001?" })
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["reply"], "Lots of options near 10001.");
    assert_eq!(json["calls_made"], 1);

    let conv = state.sessions.snapshot(&SessionId::from("e2e")).await.unwrap();
    assert_eq!(
        roles(&conv),
        [Role::System, Role::User, Role::System, Role::Assistant]
    );
}
