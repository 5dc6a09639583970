//! Built-in prompts.

use cinemate_config::AgentConfig;

const PERSONA: &str = "\
You are a friendly movie assistant. You help people find out what is playing, \
look up showtimes near them, read what critics thought, and buy tickets.

Guidelines:
- To list what is in theaters, call get_now_playing_movies.
- Showtimes depend on where the user is. If they have not given a zip code, \
ask for one before calling get_showtimes. If the location does not look like \
a real place, ask again.
- Reviews are looked up by movie id. Use the ids from get_now_playing_movies; \
if you do not know which movie the user means, ask for the title.
- Summarize reviews briefly and never spoil the plot.
- Listings change. If you are unsure about a time or availability, say so and \
suggest checking with the theater.
";

const ADVISORY_FUNCTIONS: &str = "\
Functions you can call:
- get_now_playing_movies()
    Lists the movies currently in theaters, with their ids.
- get_showtimes(title, location)
    Showtimes for a title near a zip code. An empty title lists every movie.
- get_reviews(movie_id)
    Critic reviews for one movie.
- buy_ticket(theater, movie, showtime)
    Buys one ticket and returns a confirmation with a ticket id.

Before buying, make sure you know the theater, the movie and the showtime.
";

const CONFIRMATION_FUNCTIONS: &str = "\
Functions you can call:
- get_now_playing_movies()
    Lists the movies currently in theaters, with their ids.
- get_showtimes(title, location)
    Showtimes for a title near a zip code. An empty title lists every movie.
- get_reviews(movie_id)
    Critic reviews for one movie.
- confirm_ticket_purchase(theater, movie, showtime)
    Checks a pending order and returns a summary to show the user.
- buy_ticket(theater, movie, showtime)
    Buys one ticket and returns a confirmation with a ticket id.

Ticket purchases always take two steps. First call confirm_ticket_purchase \
and show the summary to the user. Only call buy_ticket, with exactly the same \
theater, movie and showtime, after the user has said yes.
";

const CALL_FORMAT: &str = r#"
To call a function, reply with only this JSON object and nothing else:
{"function_name": "<name>", "arguments": {<named arguments>}}

Examples:
{"function_name": "get_now_playing_movies", "arguments": {}}
{"function_name": "get_showtimes", "arguments": {"title": "Twisters", "location": "10001"}}

The function result will be added to the conversation as a system message.
Use it to answer the user in plain language. Never show JSON to the user.
"#;

/// Instruction for the review fetch decider. The conversation follows in a
/// separate user message.
pub const FETCH_DECISION_PROMPT: &str = r#"You decide whether a movie assistant needs critic reviews before it answers.

Read the conversation. If the latest user message asks about a specific movie's
quality, reception or reviews, and reviews for that movie are not already in the
conversation, reviews should be fetched. Use the movie id exactly as it appears
in the conversation; if no id is known, leave it null.

Reply with only this JSON object:
{"subject": "<movie title or topic>", "subject_id": <movie id or null>, "should_fetch": <true|false>, "rationale": "<one short sentence>"}"#;

/// The prompt where buying is a single call.
pub fn advisory_prompt() -> String {
    format!("{PERSONA}\n{ADVISORY_FUNCTIONS}{CALL_FORMAT}")
}

/// The prompt that asks for confirmation before buying.
pub fn confirmation_prompt() -> String {
    format!("{PERSONA}\n{CONFIRMATION_FUNCTIONS}{CALL_FORMAT}")
}

/// System prompt for new sessions under `config`.
pub fn system_prompt(config: &AgentConfig) -> String {
    if let Some(custom) = config
        .system_prompt_override
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        return custom.to_string();
    }
    if config.require_purchase_confirmation {
        confirmation_prompt()
    } else {
        advisory_prompt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_prompt_lists_four_functions() {
        let prompt = advisory_prompt();
        for name in ["get_now_playing_movies", "get_showtimes", "get_reviews", "buy_ticket"] {
            assert!(prompt.contains(name));
        }
        assert!(!prompt.contains("confirm_ticket_purchase"));
    }

    #[test]
    fn confirmation_variant_selected_by_config() {
        let config = AgentConfig {
            require_purchase_confirmation: true,
            ..AgentConfig::default()
        };
        assert!(system_prompt(&config).contains("confirm_ticket_purchase"));
    }

    #[test]
    fn override_replaces_prompt() {
        let config = AgentConfig {
            system_prompt_override: Some("Only talk about Dune.".into()),
            ..AgentConfig::default()
        };
        assert_eq!(system_prompt(&config), "Only talk about Dune.");

        let blank = AgentConfig {
            system_prompt_override: Some("  ".into()),
            ..AgentConfig::default()
        };
        assert_eq!(system_prompt(&blank), advisory_prompt());
    }
}
