//! `get_reviews(movie_id)`: critic summaries for one movie.

use crate::catalog::MovieCatalog;
use async_trait::async_trait;
use cinemate_core::capability::{CallArguments, Capability, CapabilityKind};
use std::sync::Arc;

pub struct ReviewsCapability {
    catalog: Arc<MovieCatalog>,
}

impl ReviewsCapability {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Capability for ReviewsCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::LookupReviews
    }

    fn description(&self) -> &str {
        "Fetch critic reviews for a movie by its id."
    }

    async fn invoke(&self, arguments: &CallArguments) -> String {
        let raw_id = arguments.get("movie_id");
        let raw_id = raw_id.trim().trim_matches('"');

        let Some(movie) = raw_id
            .parse::<u32>()
            .ok()
            .and_then(|id| self.catalog.find_by_id(id))
        else {
            return format!("No reviews found for movie id {raw_id}.");
        };

        let reviews = self.catalog.reviews(movie.id);
        let mut out = format!("Reviews for {}:", movie.title);
        for r in &reviews {
            out.push_str(&format!("\n- {} ({}/100): {}", r.source, r.score, r.summary));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capability() -> ReviewsCapability {
        ReviewsCapability::new(Arc::new(MovieCatalog::default()))
    }

    #[tokio::test]
    async fn accepts_numeric_and_string_ids() {
        let numeric = capability()
            .invoke(&CallArguments::new(json!({"movie_id": 693134})))
            .await;
        let string = capability()
            .invoke(&CallArguments::new(json!({"movie_id": "693134"})))
            .await;
        assert!(numeric.starts_with("Reviews for Dune: Part Two:"));
        assert_eq!(numeric, string);
        assert_eq!(numeric.lines().count(), 4);
    }

    #[tokio::test]
    async fn unknown_id_is_text() {
        let out = capability()
            .invoke(&CallArguments::new(json!({"movie_id": "abc"})))
            .await;
        assert_eq!(out, "No reviews found for movie id abc.");
    }
}
