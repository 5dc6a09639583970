//! Simulated movie catalog.
//!
//! Stands in for a real listings API. Everything is derived
//! deterministically from the inputs, so the same zip code always lists the
//! same theaters and the same movie/theater pair always has the same
//! showtimes.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Movie {
    pub id: u32,
    pub title: String,
    pub rating: String,
    pub runtime_minutes: u32,
    pub genre: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub source: String,
    pub score: u8,
    pub summary: String,
}

const THEATERS: [&str; 8] = [
    "Regal Union Square",
    "AMC Empire 25",
    "Alamo Drafthouse Downtown",
    "Cinemark Riverside",
    "Angelika Film Center",
    "Landmark Sunshine",
    "Nitehawk Cinema",
    "IFC Center",
];

const SLOTS: [&str; 7] = [
    "11:30 AM", "1:45 PM", "4:15 PM", "5:30 PM", "7:00 PM", "9:30 PM", "10:45 PM",
];

const REVIEW_SOURCES: [&str; 4] = ["The Daily Reel", "Screen Notes", "Popcorn Weekly", "Film Ledger"];

const REVIEW_LINES: [&str; 8] = [
    "A confident, gorgeous piece of filmmaking that earns every minute.",
    "Strong performances carry a script that occasionally loses its way.",
    "Big, loud and surprisingly heartfelt.",
    "The second half drags, but the set pieces are worth the ticket.",
    "An instant crowd-pleaser with a terrific ensemble cast.",
    "Ambitious and uneven, though never boring.",
    "Visually stunning; the story is thinner than it looks.",
    "Funny, warm and smarter than it needs to be.",
];

/// Fixed set of now-playing movies plus derived theaters and showtimes.
pub struct MovieCatalog {
    movies: Vec<Movie>,
}

impl MovieCatalog {
    pub fn new(movies: Vec<Movie>) -> Self {
        Self { movies }
    }

    pub fn now_playing(&self) -> &[Movie] {
        &self.movies
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }

    /// Case-insensitive title match. An exact match wins over a substring.
    pub fn find_by_title(&self, title: &str) -> Option<&Movie> {
        let needle = title.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.movies
            .iter()
            .find(|m| m.title.to_lowercase() == needle)
            .or_else(|| {
                self.movies
                    .iter()
                    .find(|m| m.title.to_lowercase().contains(&needle))
            })
    }

    /// Three theaters near `location`. Any non-empty string is accepted.
    pub fn theaters_near(&self, location: &str) -> Vec<&'static str> {
        let start = stable_hash(location.trim()) as usize % THEATERS.len();
        (0..3).map(|i| THEATERS[(start + i * 3) % THEATERS.len()]).collect()
    }

    pub fn is_theater(&self, name: &str) -> bool {
        let name = name.trim();
        THEATERS.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Showtimes for one movie at one theater, in day order.
    pub fn showtimes(&self, movie: &Movie, theater: &str) -> Vec<&'static str> {
        let hash = stable_hash(&format!("{}|{}", movie.id, theater.trim().to_lowercase()));
        let count = 3 + (hash % 3) as usize;
        let offset = (hash / 3) as usize % (SLOTS.len() - count + 1);
        SLOTS[offset..offset + count].to_vec()
    }

    /// Whether `showtime` is one of the listed times, ignoring case and spacing.
    pub fn has_showtime(&self, movie: &Movie, theater: &str, showtime: &str) -> bool {
        let wanted = normalize_time(showtime);
        self.showtimes(movie, theater)
            .iter()
            .any(|t| normalize_time(t) == wanted)
    }

    pub fn reviews(&self, movie_id: u32) -> Vec<Review> {
        let Some(movie) = self.find_by_id(movie_id) else {
            return Vec::new();
        };
        let hash = stable_hash(&movie.title);
        (0..3)
            .map(|i| {
                let pick = (hash as usize / (i + 1)) + i;
                Review {
                    source: REVIEW_SOURCES[(i + hash as usize) % REVIEW_SOURCES.len()].to_string(),
                    score: 55 + ((hash >> (i * 4)) % 45) as u8,
                    summary: REVIEW_LINES[pick % REVIEW_LINES.len()].to_string(),
                }
            })
            .collect()
    }
}

impl Default for MovieCatalog {
    fn default() -> Self {
        let movie = |id: u32, title: &str, rating: &str, runtime_minutes: u32, genre: &str| Movie {
            id,
            title: title.to_string(),
            rating: rating.to_string(),
            runtime_minutes,
            genre: genre.to_string(),
        };
        Self::new(vec![
            movie(693134, "Dune: Part Two", "PG-13", 166, "Science Fiction"),
            movie(1022789, "Inside Out 2", "PG", 96, "Animation"),
            movie(533535, "Deadpool & Wolverine", "R", 128, "Action"),
            movie(718821, "Twisters", "PG-13", 122, "Thriller"),
            movie(945961, "Alien: Romulus", "R", 119, "Horror"),
            movie(1184918, "The Wild Robot", "PG", 102, "Animation"),
        ])
    }
}

/// Simple multiplicative hash, stable across runs and platforms.
fn stable_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

fn normalize_time(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}
