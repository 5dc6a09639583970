//! Turn generator: one streaming completion over the current history.

use crate::sink::TurnSink;
use crate::stream_event::AgentStreamEvent;
use cinemate_core::error::{Error, Result};
use cinemate_core::message::{Message, Role};
use cinemate_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, trace};

/// Fixed settings applied to every generation.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: 0.2,
            max_tokens: 500,
        }
    }
}

#[derive(Clone)]
pub struct TurnGenerator {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl TurnGenerator {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Stream one completion and return the concatenated text.
    ///
    /// Each fragment is emitted to `sink` as it arrives. A stream error fails
    /// the generation; nothing is retried.
    pub async fn generate(
        &self,
        history: &[Message],
        generation: usize,
        sink: &dyn TurnSink,
    ) -> Result<String> {
        match history.first() {
            Some(first) if first.role == Role::System => {}
            _ => {
                return Err(Error::InvalidConversation(
                    "history must start with a system message".into(),
                ));
            }
        }

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages: history.to_vec(),
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
            stream: true,
            stop: vec![],
        };

        debug!(
            provider = %self.provider.name(),
            messages = history.len(),
            generation,
            "Starting generation"
        );

        let mut rx = self.provider.stream(request).await?;
        let mut text = String::new();

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                trace!(fragment = %content, "Received fragment");
                text.push_str(&content);
                sink.emit(AgentStreamEvent::Chunk {
                    generation,
                    content,
                })
                .await;
            }
            if chunk.done {
                break;
            }
        }

        Ok(text)
    }
}
