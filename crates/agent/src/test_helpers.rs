//! Shared test helpers for agent tests.

use crate::sink::TurnSink;
use crate::stream_event::AgentStreamEvent;
use cinemate_core::capability::{CallArguments, Capability, CapabilityKind};
use cinemate_core::error::ProviderError;
use cinemate_core::message::Message;
use cinemate_core::provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk};
use std::sync::Mutex;

/// A provider that replays scripted responses in order.
///
/// `stream` splits each response into `fragment_len`-character chunks.
/// Every request is recorded so tests can inspect what the model saw.
pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
    fragment_len: usize,
    fail: bool,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
            fragment_len: usize::MAX,
            fail: false,
        }
    }

    /// Every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn with_fragments(mut self, fragment_len: usize) -> Self {
        self.fragment_len = fragment_len.max(1);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if self.fail {
            return Err(ProviderError::Network("connection refused".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedProvider exhausted at call #{call}");
        }
        Ok(responses.remove(0))
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let text = self.next(request)?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "mock-model".into(),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let text = self.next(request)?;
        let chars: Vec<char> = text.chars().collect();
        let pieces: Vec<String> = chars
            .chunks(self.fragment_len.min(chars.len().max(1)))
            .map(|c| c.iter().collect())
            .collect();

        let (tx, rx) = tokio::sync::mpsc::channel(pieces.len() + 1);
        for piece in pieces {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(piece),
                    done: false,
                    usage: None,
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                done: true,
                usage: None,
            }))
            .await;
        Ok(rx)
    }
}

/// Sink that keeps every event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AgentStreamEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AgentStreamEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TurnSink for RecordingSink {
    async fn emit(&self, event: AgentStreamEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Capability stub that echoes its kind and arguments.
pub struct EchoCapability(pub CapabilityKind);

#[async_trait::async_trait]
impl Capability for EchoCapability {
    fn kind(&self) -> CapabilityKind {
        self.0
    }

    fn description(&self) -> &str {
        "echo"
    }

    async fn invoke(&self, arguments: &CallArguments) -> String {
        format!("{} -> {}", self.0.wire_name(), arguments.as_value())
    }
}
