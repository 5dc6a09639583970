//! Proactive review fetch.
//!
//! Before the loop runs, a side-channel generation looks at the whole
//! conversation and decides whether reviews for a movie should be put into
//! context. A yes with an id invokes the review capability directly and
//! appends its result as a system message. Any failure leaves the
//! conversation untouched.

use crate::generator::TurnGenerator;
use crate::prompts::FETCH_DECISION_PROMPT;
use crate::sink::NullSink;
use cinemate_core::capability::{CallArguments, Capability};
use cinemate_core::event::{DomainEvent, EventBus};
use cinemate_core::message::{Conversation, Message};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchDecision {
    #[serde(default)]
    pub subject: String,
    #[serde(default, deserialize_with = "id_from_string_or_number")]
    pub subject_id: Option<String>,
    pub should_fetch: bool,
    #[serde(default)]
    pub rationale: String,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse the decider's answer. Tolerates a surrounding markdown code fence.
pub fn parse_decision(text: &str) -> Option<FetchDecision> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).ok()
}

/// The whole history as one `role: content` block.
pub fn render_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct FetchDecider {
    generator: TurnGenerator,
    reviews: Arc<dyn Capability>,
    event_bus: Arc<EventBus>,
}

impl FetchDecider {
    pub fn new(
        generator: TurnGenerator,
        reviews: Arc<dyn Capability>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            generator,
            reviews,
            event_bus,
        }
    }

    /// Ask the model for a decision. `None` when the call fails or the answer
    /// does not parse.
    pub async fn decide(&self, history: &[Message]) -> Option<FetchDecision> {
        let prompt = [
            Message::system(FETCH_DECISION_PROMPT),
            Message::user(render_history(history)),
        ];

        let text = match self.generator.generate(&prompt, 0, &NullSink).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Fetch decision failed, continuing without it");
                return None;
            }
        };

        let decision = parse_decision(&text);
        if decision.is_none() {
            debug!(raw = %text, "Fetch decision did not parse, skipping");
        }
        decision
    }

    /// Decide and, when warranted, append reviews. Returns whether anything
    /// was appended.
    pub async fn run(&self, conversation: &mut Conversation) -> bool {
        let Some(decision) = self.decide(conversation.messages()).await else {
            return false;
        };

        debug!(
            subject = %decision.subject,
            should_fetch = decision.should_fetch,
            rationale = %decision.rationale,
            "Fetch decision"
        );

        let (true, Some(subject_id)) = (decision.should_fetch, decision.subject_id) else {
            return false;
        };

        let arguments = CallArguments::new(serde_json::json!({ "movie_id": subject_id }));
        let reviews = self.reviews.invoke(&arguments).await;
        conversation.push(Message::system(reviews));

        self.event_bus.publish(DomainEvent::ReviewsPrefetched {
            session_id: conversation.id.to_string(),
            subject_id,
            timestamp: chrono::Utc::now(),
        });
        true
    }
}
