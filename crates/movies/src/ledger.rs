//! Booking ledger: the only mutable state behind the capabilities.

use chrono::{DateTime, Utc};
use cinemate_core::CallArguments;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// The theater/movie/showtime triple shared by purchase and confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub theater: String,
    pub movie: String,
    pub showtime: String,
}

impl TicketRequest {
    pub fn from_arguments(arguments: &CallArguments) -> Self {
        Self {
            theater: arguments.get("theater"),
            movie: arguments.get("movie"),
            showtime: arguments.get("showtime"),
        }
    }

    /// Name of the first empty field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("theater", &self.theater),
            ("movie", &self.movie),
            ("showtime", &self.showtime),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Case- and whitespace-insensitive comparison.
    pub fn matches(&self, other: &TicketRequest) -> bool {
        fn norm(s: &str) -> String {
            s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
        }
        norm(&self.theater) == norm(&other.theater)
            && norm(&self.movie) == norm(&other.movie)
            && norm(&self.showtime).replace(' ', "") == norm(&other.showtime).replace(' ', "")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub ticket_id: String,
    #[serde(flatten)]
    pub request: TicketRequest,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct BookingLedger {
    bookings: Mutex<Vec<Booking>>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, request: TicketRequest) -> Booking {
        let booking = Booking {
            ticket_id: uuid::Uuid::new_v4().to_string(),
            request,
            purchased_at: Utc::now(),
        };
        self.lock().push(booking.clone());
        tracing::info!(
            ticket_id = %booking.ticket_id,
            movie = %booking.request.movie,
            "Ticket purchased"
        );
        booking
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Booking>> {
        // A poisoned ledger still holds valid bookings
        self.bookings.lock().unwrap_or_else(|e| e.into_inner())
    }
}
