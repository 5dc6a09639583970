//! Capability trait: the fixed set of movie lookup and booking operations
//! the model may invoke by name.
//!
//! Names resolve to a closed enum. Anything outside it is `Resolved::Unknown`
//! and dispatch answers with text instead of failing the turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The closed set of capabilities the model can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    ListNowPlaying,
    LookupShowtimes,
    LookupReviews,
    PurchaseTicket,
    ConfirmPurchase,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 5] = [
        CapabilityKind::ListNowPlaying,
        CapabilityKind::LookupShowtimes,
        CapabilityKind::LookupReviews,
        CapabilityKind::PurchaseTicket,
        CapabilityKind::ConfirmPurchase,
    ];

    /// The function name used in model output.
    pub fn wire_name(&self) -> &'static str {
        match self {
            CapabilityKind::ListNowPlaying => "get_now_playing_movies",
            CapabilityKind::LookupShowtimes => "get_showtimes",
            CapabilityKind::LookupReviews => "get_reviews",
            CapabilityKind::PurchaseTicket => "buy_ticket",
            CapabilityKind::ConfirmPurchase => "confirm_ticket_purchase",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    /// Named arguments this capability reads, in call order.
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            CapabilityKind::ListNowPlaying => &[],
            CapabilityKind::LookupShowtimes => &["title", "location"],
            CapabilityKind::LookupReviews => &["movie_id"],
            CapabilityKind::PurchaseTicket | CapabilityKind::ConfirmPurchase => {
                &["theater", "movie", "showtime"]
            }
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Result of resolving a wire name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Known(CapabilityKind),
    Unknown(String),
}

impl Resolved {
    pub fn from_name(name: &str) -> Self {
        match CapabilityKind::from_name(name) {
            Some(kind) => Resolved::Known(kind),
            None => Resolved::Unknown(name.to_string()),
        }
    }
}

/// Arguments of a structured call, kept as raw JSON until a capability reads
/// its named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallArguments(pub serde_json::Value);

impl CallArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Read a named field. Missing fields, or arguments that are not an
    /// object, yield the empty string. Non-string values are rendered as JSON.
    pub fn get(&self, name: &str) -> String {
        match self.0.get(name) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for CallArguments {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A request from the model to invoke a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCall {
    pub function_name: String,
    pub arguments: CallArguments,
}

/// One invocable capability.
///
/// Implementations never fail: a lookup that finds nothing answers with
/// text saying so.
#[async_trait]
pub trait Capability: Send + Sync {
    fn kind(&self) -> CapabilityKind;

    /// A short description used in prompts and diagnostics.
    fn description(&self) -> &str;

    async fn invoke(&self, arguments: &CallArguments) -> String;
}

/// Lookup table from capability kind to its handler.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Register a capability. Replaces any existing handler of the same kind.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.kind(), capability);
    }

    pub fn resolve(&self, name: &str) -> Resolved {
        Resolved::from_name(name)
    }

    pub fn get(&self, kind: CapabilityKind) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&kind).cloned()
    }

    pub fn contains(&self, kind: CapabilityKind) -> bool {
        self.capabilities.contains_key(&kind)
    }

    /// Registered kinds in their declaration order.
    pub fn kinds(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Dispatch by wire name. Unknown or unregistered names answer with
    /// `Unknown function: <name>`.
    pub async fn dispatch(&self, name: &str, arguments: &CallArguments) -> String {
        match self.resolve(name) {
            Resolved::Known(kind) => match self.capabilities.get(&kind) {
                Some(capability) => capability.invoke(arguments).await,
                None => unknown_function(name),
            },
            Resolved::Unknown(name) => unknown_function(&name),
        }
    }
}

fn unknown_function(name: &str) -> String {
    format!("Unknown function: {name}")
}
