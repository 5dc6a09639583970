//! `get_showtimes(title, location)`: showtimes near a location.
//!
//! An empty title lists every movie playing at the nearby theaters.

use crate::catalog::{Movie, MovieCatalog};
use async_trait::async_trait;
use cinemate_core::capability::{CallArguments, Capability, CapabilityKind};
use std::sync::Arc;

pub struct ShowtimesCapability {
    catalog: Arc<MovieCatalog>,
}

impl ShowtimesCapability {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self { catalog }
    }

    fn render(&self, movies: &[&Movie], location: &str) -> String {
        let mut out = format!("Showtimes near {location}:");
        for theater in self.catalog.theaters_near(location) {
            out.push_str(&format!("\n{theater}"));
            for movie in movies {
                let times = self.catalog.showtimes(movie, theater);
                out.push_str(&format!("\n  - {}: {}", movie.title, times.join(", ")));
            }
        }
        out
    }
}

#[async_trait]
impl Capability for ShowtimesCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::LookupShowtimes
    }

    fn description(&self) -> &str {
        "Find showtimes for a movie title near a location such as a zip code."
    }

    async fn invoke(&self, arguments: &CallArguments) -> String {
        let title = arguments.get("title");
        let location = arguments.get("location");
        let location = location.trim();

        if location.is_empty() {
            return "A location is needed to look up showtimes.".into();
        }

        if title.trim().is_empty() {
            let all: Vec<&Movie> = self.catalog.now_playing().iter().collect();
            return self.render(&all, location);
        }

        match self.catalog.find_by_title(&title) {
            Some(movie) => self.render(&[movie], location),
            None => format!("No showtimes found for \"{}\" near {location}.", title.trim()),
        }
    }
}
