//! `buy_ticket` and `confirm_ticket_purchase`.
//!
//! Both validate the theater/movie/showtime triple against the catalog.
//! Only `buy_ticket` writes to the ledger; confirmation just restates the
//! order so the model can ask the user.

use crate::catalog::{Movie, MovieCatalog};
use crate::ledger::{BookingLedger, TicketRequest};
use async_trait::async_trait;
use cinemate_core::capability::{CallArguments, Capability, CapabilityKind};
use std::sync::Arc;

/// Check a request against the catalog, answering with the reason on failure.
fn validate<'a>(catalog: &'a MovieCatalog, request: &TicketRequest) -> Result<&'a Movie, String> {
    if let Some(field) = request.missing_field() {
        return Err(format!("Cannot book a ticket without a {field}."));
    }

    let movie = catalog
        .find_by_title(&request.movie)
        .ok_or_else(|| format!("\"{}\" is not currently playing.", request.movie))?;

    if !catalog.is_theater(&request.theater) {
        return Err(format!("Unknown theater \"{}\".", request.theater));
    }

    if !catalog.has_showtime(movie, &request.theater, &request.showtime) {
        let times = catalog.showtimes(movie, &request.theater).join(", ");
        return Err(format!(
            "{} is not showing at {} at {}. Available times: {times}.",
            movie.title, request.theater, request.showtime
        ));
    }

    Ok(movie)
}

pub struct BuyTicketCapability {
    catalog: Arc<MovieCatalog>,
    ledger: Arc<BookingLedger>,
}

impl BuyTicketCapability {
    pub fn new(catalog: Arc<MovieCatalog>, ledger: Arc<BookingLedger>) -> Self {
        Self { catalog, ledger }
    }
}

#[async_trait]
impl Capability for BuyTicketCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::PurchaseTicket
    }

    fn description(&self) -> &str {
        "Buy one ticket for a movie at a theater and showtime."
    }

    async fn invoke(&self, arguments: &CallArguments) -> String {
        let request = TicketRequest::from_arguments(arguments);
        let movie = match validate(&self.catalog, &request) {
            Ok(movie) => movie,
            Err(reason) => return reason,
        };

        let title = movie.title.clone();
        let booking = self.ledger.record(request);
        format!(
            "Ticket purchased for {title} at {} at {}. Ticket id: {}.",
            booking.request.theater, booking.request.showtime, booking.ticket_id
        )
    }
}

pub struct ConfirmPurchaseCapability {
    catalog: Arc<MovieCatalog>,
}

impl ConfirmPurchaseCapability {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Capability for ConfirmPurchaseCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::ConfirmPurchase
    }

    fn description(&self) -> &str {
        "Summarize a pending ticket order so the user can confirm it before buying."
    }

    async fn invoke(&self, arguments: &CallArguments) -> String {
        let request = TicketRequest::from_arguments(arguments);
        match validate(&self.catalog, &request) {
            Ok(movie) => format!(
                "Pending order: 1 ticket for {} ({}) at {} at {}. Ask the user to confirm before buying.",
                movie.title, movie.rating, request.theater, request.showtime
            ),
            Err(reason) => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_arguments(catalog: &MovieCatalog) -> CallArguments {
        let movie = catalog.find_by_id(718821).unwrap();
        let showtime = catalog.showtimes(movie, "IFC Center")[0];
        CallArguments::new(json!({
            "theater": "IFC Center",
            "movie": "Twisters",
            "showtime": showtime,
        }))
    }

    #[tokio::test]
    async fn buy_records_booking() {
        let catalog = Arc::new(MovieCatalog::default());
        let ledger = Arc::new(BookingLedger::new());
        let capability = BuyTicketCapability::new(catalog.clone(), ledger.clone());

        let out = capability.invoke(&valid_arguments(&catalog)).await;
        assert!(out.starts_with("Ticket purchased for Twisters at IFC Center"));
        assert_eq!(ledger.len(), 1);
        assert!(out.contains(&ledger.bookings()[0].ticket_id));
    }

    #[tokio::test]
    async fn buy_with_wrong_showtime_lists_alternatives() {
        let catalog = Arc::new(MovieCatalog::default());
        let ledger = Arc::new(BookingLedger::new());
        let capability = BuyTicketCapability::new(catalog, ledger.clone());

        let out = capability
            .invoke(&CallArguments::new(json!({
                "theater": "IFC Center",
                "movie": "Twisters",
                "showtime": "3:33 AM",
            })))
            .await;
        assert!(out.contains("Available times:"));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn buy_with_missing_fields_is_refused() {
        let capability = BuyTicketCapability::new(
            Arc::new(MovieCatalog::default()),
            Arc::new(BookingLedger::new()),
        );
        let out = capability.invoke(&CallArguments::default()).await;
        assert_eq!(out, "Cannot book a ticket without a theater.");
    }

    #[tokio::test]
    async fn buy_unknown_theater() {
        let capability = BuyTicketCapability::new(
            Arc::new(MovieCatalog::default()),
            Arc::new(BookingLedger::new()),
        );
        let out = capability
            .invoke(&CallArguments::new(json!({
                "theater": "Drive-In 9",
                "movie": "Twisters",
                "showtime": "7:00 PM",
            })))
            .await;
        assert_eq!(out, "Unknown theater \"Drive-In 9\".");
    }

    #[tokio::test]
    async fn confirm_does_not_book() {
        let catalog = Arc::new(MovieCatalog::default());
        let capability = ConfirmPurchaseCapability::new(catalog.clone());
        let out = capability.invoke(&valid_arguments(&catalog)).await;
        assert!(out.starts_with("Pending order: 1 ticket for Twisters"));
    }
}
