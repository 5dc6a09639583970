//! Confirmation gate for ticket purchases.
//!
//! Confirmed orders are kept in the conversation's metadata, so they belong
//! to one session and never reach the model. A purchase consumes the matching
//! confirmation.

use cinemate_core::capability::CallArguments;
use cinemate_core::message::Conversation;
use cinemate_movies::TicketRequest;

const CONFIRMED_KEY: &str = "confirmed_purchases";

pub const REFUSAL: &str = "Purchase not made: this order has not been confirmed. \
Call confirm_ticket_purchase with the same theater, movie and showtime, show the \
summary to the user, and only buy after they agree.";

fn load(conversation: &Conversation) -> Vec<TicketRequest> {
    conversation
        .metadata
        .get(CONFIRMED_KEY)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn store(conversation: &mut Conversation, items: &[TicketRequest]) {
    match serde_json::to_value(items) {
        Ok(value) => {
            conversation
                .metadata
                .insert(CONFIRMED_KEY.to_string(), value);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to store purchase confirmations"),
    }
}

pub fn record_confirmation(conversation: &mut Conversation, arguments: &CallArguments) {
    let request = TicketRequest::from_arguments(arguments);
    let mut items = load(conversation);
    if !items.iter().any(|item| item.matches(&request)) {
        items.push(request);
    }
    store(conversation, &items);
}

/// Remove the confirmation matching `arguments`. Returns whether one existed.
pub fn take_confirmation(conversation: &mut Conversation, arguments: &CallArguments) -> bool {
    let request = TicketRequest::from_arguments(arguments);
    let mut items = load(conversation);
    let Some(index) = items.iter().position(|item| item.matches(&request)) else {
        return false;
    };
    items.remove(index);
    store(conversation, &items);
    true
}
