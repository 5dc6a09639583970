//! # Cinemate Core
//!
//! Domain types, traits, and error definitions for the Cinemate movie
//! assistant. This crate has **zero framework dependencies**: it defines the
//! domain model that the provider, capability, agent and transport crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! The model backend and the movie capabilities are traits here, with their
//! implementations in their own crates. This keeps the orchestration loop
//! testable with scripted providers and stub capabilities.

pub mod capability;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use capability::{
    CallArguments, Capability, CapabilityKind, CapabilityRegistry, Resolved, StructuredCall,
};
pub use error::{Error, ProviderError, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, Message, Role, SessionId};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use session::{SessionHandle, SessionStore};
