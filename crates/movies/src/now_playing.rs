//! `get_now_playing_movies`: lists the current catalog.

use crate::catalog::MovieCatalog;
use async_trait::async_trait;
use cinemate_core::capability::{CallArguments, Capability, CapabilityKind};
use std::sync::Arc;

pub struct NowPlayingCapability {
    catalog: Arc<MovieCatalog>,
}

impl NowPlayingCapability {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Capability for NowPlayingCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::ListNowPlaying
    }

    fn description(&self) -> &str {
        "List the movies currently playing in theaters, with their ids."
    }

    async fn invoke(&self, _arguments: &CallArguments) -> String {
        let movies = self.catalog.now_playing();
        if movies.is_empty() {
            return "No movies are playing right now.".into();
        }

        let mut out = String::from("Now playing:");
        for m in movies {
            out.push_str(&format!(
                "\n- {} (id {}, {}, {} min, {})",
                m.title, m.id, m.rating, m.runtime_minutes, m.genre
            ));
        }
        out
    }
}
