//! The orchestration loop.
//!
//! One user message drives the loop through
//! `Generating → Interpreting → (Dispatching → Generating)* → Done`.
//! Structured calls are dispatched through the capability registry and their
//! results are folded back into history as system messages. The first plain
//! reply ends the turn.

use crate::fetch_decider::FetchDecider;
use crate::generator::{GenerationSettings, TurnGenerator};
use crate::interpreter::{Interpretation, interpret};
use crate::purchase_gate;
use crate::sink::TurnSink;
use crate::stream_event::AgentStreamEvent;
use cinemate_core::capability::{CapabilityKind, CapabilityRegistry, Resolved, StructuredCall};
use cinemate_core::error::Result;
use cinemate_core::event::{DomainEvent, EventBus};
use cinemate_core::message::{Conversation, Message};
use cinemate_core::provider::Provider;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply delivered when a turn runs out of capability dispatches.
pub const CALL_LIMIT_REPLY: &str = "Sorry, I couldn't finish looking that up. \
Could you rephrase the request or narrow it down a little?";

#[derive(Debug)]
enum LoopState {
    Generating,
    Interpreting(String),
    Dispatching(StructuredCall),
    Done(String),
}

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The visible reply, also appended to history as an assistant message
    pub reply: String,
    pub generations: usize,
    pub calls_made: usize,
    /// Whether the turn ended on the dispatch cap
    pub hit_call_limit: bool,
}

/// Runs turns against a conversation.
pub struct AgentLoop {
    generator: TurnGenerator,

    capabilities: Arc<CapabilityRegistry>,

    /// Review prefetch before each turn
    decider: Option<FetchDecider>,

    event_bus: Arc<EventBus>,

    /// Capability dispatches allowed per turn
    max_calls_per_turn: usize,

    /// Refuse `buy_ticket` without a matching confirmation
    require_confirmation: bool,
}

impl AgentLoop {
    /// Create a new agent loop. The fetch decider is off until enabled.
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: GenerationSettings,
        capabilities: Arc<CapabilityRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            generator: TurnGenerator::new(provider, settings),
            capabilities,
            decider: None,
            event_bus,
            max_calls_per_turn: 8,
            require_confirmation: false,
        }
    }

    /// Build a loop from application config.
    pub fn from_config(
        config: &cinemate_config::AppConfig,
        provider: Arc<dyn Provider>,
        capabilities: Arc<CapabilityRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let settings = GenerationSettings {
            model: cinemate_providers::router::resolve_model(config),
            temperature: config.default_temperature,
            max_tokens: config.default_max_tokens,
        };
        Self::new(provider, settings, capabilities, event_bus)
            .with_max_calls_per_turn(config.agent.max_calls_per_turn)
            .with_fetch_decider(config.agent.proactive_fetch)
            .with_purchase_confirmation(config.agent.require_purchase_confirmation)
    }

    /// Set the maximum number of capability dispatches per turn.
    pub fn with_max_calls_per_turn(mut self, max: usize) -> Self {
        self.max_calls_per_turn = max.max(1);
        self
    }

    /// Enable or disable the review fetch decider. It needs a registered
    /// review capability; without one it stays off.
    pub fn with_fetch_decider(mut self, enabled: bool) -> Self {
        self.decider = if enabled {
            match self.capabilities.get(CapabilityKind::LookupReviews) {
                Some(reviews) => Some(FetchDecider::new(
                    self.generator.clone(),
                    reviews,
                    self.event_bus.clone(),
                )),
                None => {
                    warn!("No review capability registered, fetch decider disabled");
                    None
                }
            }
        } else {
            None
        };
        self
    }

    /// Require `confirm_ticket_purchase` before `buy_ticket` is dispatched.
    pub fn with_purchase_confirmation(mut self, required: bool) -> Self {
        self.require_confirmation = required;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        self.generator.settings()
    }

    /// Run one turn for `user_text`.
    ///
    /// On success the conversation has gained the user message, any
    /// prefetched reviews and capability results as system messages, and
    /// exactly one assistant reply. A provider failure ends the turn with an
    /// error; whatever was appended before the failure stays in history.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        sink: &dyn TurnSink,
    ) -> Result<TurnOutcome> {
        conversation.validate()?;

        info!(
            session_id = %conversation.id,
            messages = conversation.len(),
            "Processing turn"
        );

        conversation.push(Message::user(user_text));
        self.event_bus.publish(DomainEvent::TurnStarted {
            session_id: conversation.id.to_string(),
            content_preview: user_text.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        if let Some(decider) = &self.decider
            && decider.run(conversation).await
        {
            debug!(session_id = %conversation.id, "Reviews prefetched");
        }

        match self.drive(conversation, sink).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(session_id = %conversation.id, error = %e, "Turn failed");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("turn:{}", conversation.id),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                sink.emit(AgentStreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        sink: &dyn TurnSink,
    ) -> Result<TurnOutcome> {
        let mut state = LoopState::Generating;
        let mut generations = 0;
        let mut calls_made = 0;
        let mut hit_call_limit = false;

        loop {
            state = match state {
                LoopState::Generating => {
                    generations += 1;
                    debug!(
                        session_id = %conversation.id,
                        generation = generations,
                        "Agent loop iteration"
                    );
                    let text = self
                        .generator
                        .generate(conversation.messages(), generations, sink)
                        .await?;
                    self.event_bus.publish(DomainEvent::ResponseGenerated {
                        session_id: conversation.id.to_string(),
                        model: self.generator.settings().model.clone(),
                        generation: generations,
                        chars: text.len(),
                        timestamp: Utc::now(),
                    });
                    LoopState::Interpreting(text)
                }

                LoopState::Interpreting(text) => match interpret(&text) {
                    Interpretation::Call(call) => {
                        sink.emit(AgentStreamEvent::Discard {
                            generation: generations,
                        })
                        .await;
                        LoopState::Dispatching(call)
                    }
                    Interpretation::Reply(reply) => LoopState::Done(reply),
                },

                LoopState::Dispatching(call) => {
                    if calls_made >= self.max_calls_per_turn {
                        warn!(
                            session_id = %conversation.id,
                            calls_made,
                            function = %call.function_name,
                            "Call limit reached, ending turn"
                        );
                        hit_call_limit = true;
                        LoopState::Done(CALL_LIMIT_REPLY.to_string())
                    } else {
                        calls_made += 1;
                        let result = self.dispatch(conversation, &call).await;
                        conversation.push(Message::system(result));
                        LoopState::Generating
                    }
                }

                LoopState::Done(reply) => {
                    conversation.push(Message::assistant(&reply));
                    sink.emit(AgentStreamEvent::Reply {
                        content: reply.clone(),
                    })
                    .await;
                    sink.emit(AgentStreamEvent::Done {
                        session_id: conversation.id.to_string(),
                        generations,
                        calls_made,
                    })
                    .await;
                    self.event_bus.publish(DomainEvent::ReplyDelivered {
                        session_id: conversation.id.to_string(),
                        generations,
                        calls_made,
                        timestamp: Utc::now(),
                    });
                    info!(
                        session_id = %conversation.id,
                        generations,
                        calls_made,
                        "Turn complete"
                    );
                    return Ok(TurnOutcome {
                        reply,
                        generations,
                        calls_made,
                        hit_call_limit,
                    });
                }
            };
        }
    }

    /// Dispatch one call, applying the purchase gate when enabled.
    async fn dispatch(&self, conversation: &mut Conversation, call: &StructuredCall) -> String {
        let resolved = self.capabilities.resolve(&call.function_name);
        let known = matches!(&resolved, Resolved::Known(kind) if self.capabilities.contains(*kind));
        let start = std::time::Instant::now();

        let result = match resolved {
            Resolved::Known(CapabilityKind::PurchaseTicket)
                if self.require_confirmation
                    && !purchase_gate::take_confirmation(conversation, &call.arguments) =>
            {
                debug!(session_id = %conversation.id, "Unconfirmed purchase refused");
                purchase_gate::REFUSAL.to_string()
            }
            Resolved::Known(CapabilityKind::ConfirmPurchase) if known => {
                purchase_gate::record_confirmation(conversation, &call.arguments);
                self.capabilities
                    .dispatch(&call.function_name, &call.arguments)
                    .await
            }
            _ => {
                self.capabilities
                    .dispatch(&call.function_name, &call.arguments)
                    .await
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            function = %call.function_name,
            known,
            duration_ms,
            "Dispatched call"
        );
        self.event_bus.publish(DomainEvent::CapabilityInvoked {
            name: call.function_name.clone(),
            known,
            duration_ms,
            timestamp: Utc::now(),
        });

        result
    }
}
