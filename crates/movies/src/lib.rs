//! Movie capabilities for Cinemate.
//!
//! A simulated catalog stands in for a real listings and ticketing API so the
//! agent loop runs end to end without network access. Each capability lives
//! in its own module and answers with plain text.

pub mod catalog;
pub mod ledger;
pub mod now_playing;
pub mod reviews;
pub mod showtimes;
pub mod tickets;

use cinemate_core::capability::CapabilityRegistry;
use std::sync::Arc;

pub use catalog::{Movie, MovieCatalog, Review};
pub use ledger::{Booking, BookingLedger, TicketRequest};

/// Create the registry the agent dispatches through.
///
/// `confirm_ticket_purchase` is only registered when `with_confirmation` is
/// set; otherwise the name resolves but reports as unknown.
pub fn default_registry(
    catalog: Arc<MovieCatalog>,
    ledger: Arc<BookingLedger>,
    with_confirmation: bool,
) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(now_playing::NowPlayingCapability::new(catalog.clone())));
    registry.register(Arc::new(showtimes::ShowtimesCapability::new(catalog.clone())));
    registry.register(Arc::new(reviews::ReviewsCapability::new(catalog.clone())));
    registry.register(Arc::new(tickets::BuyTicketCapability::new(
        catalog.clone(),
        ledger,
    )));
    if with_confirmation {
        registry.register(Arc::new(tickets::ConfirmPurchaseCapability::new(catalog)));
    }
    registry
}
