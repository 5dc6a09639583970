//! The Cinemate agent loop.
//!
//! Every user message runs one turn:
//!
//! 1. **Append** the user message to the session history
//! 2. **Prefetch** reviews when the fetch decider says the user is asking about one movie
//! 3. **Generate** a streaming completion over the full history
//! 4. **If the output is a structured call**: dispatch it, append the result as a
//!    system message, and generate again
//! 5. **If it is plain text**: append it as the assistant reply and finish
//!
//! Dispatches per turn are capped; when the cap is reached the turn ends with
//! a fixed fallback reply.

pub mod fetch_decider;
pub mod generator;
pub mod interpreter;
pub mod loop_runner;
pub mod prompts;
pub mod purchase_gate;
pub mod sink;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use fetch_decider::{FetchDecider, FetchDecision};
pub use generator::{GenerationSettings, TurnGenerator};
pub use interpreter::{Interpretation, interpret};
pub use loop_runner::{AgentLoop, TurnOutcome};
pub use sink::{NullSink, TurnSink};
pub use stream_event::AgentStreamEvent;
