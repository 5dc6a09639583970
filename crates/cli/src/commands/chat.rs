//! `cinemate chat`: Interactive or single-message chat mode.
//!
//! Replies stream to the terminal as they are generated. A draft that starts
//! like a JSON object is held back until the loop says whether it was a
//! structured call (dropped) or the reply (printed).

use std::io::Write;
use std::sync::Arc;

use cinemate_agent::{AgentLoop, AgentStreamEvent};
use cinemate_config::AppConfig;
use cinemate_core::event::EventBus;
use cinemate_core::message::{Conversation, SessionId};
use cinemate_movies::{BookingLedger, MovieCatalog};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const PREFIX: &str = "  Assistant > ";

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    OPENAI_API_KEY     = 'sk-...'");
        eprintln!("    OPENROUTER_API_KEY = 'sk-or-v1-...'");
        eprintln!("    CINEMATE_API_KEY   = '...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = cinemate_providers::build_from_config(&config).default_provider()?;
    let capabilities = Arc::new(cinemate_movies::default_registry(
        Arc::new(MovieCatalog::default()),
        Arc::new(BookingLedger::new()),
        config.agent.require_purchase_confirmation,
    ));
    let agent = AgentLoop::from_config(
        &config,
        provider,
        capabilities,
        Arc::new(EventBus::default()),
    );
    let mut conv = Conversation::start(
        SessionId::new(),
        cinemate_agent::prompts::system_prompt(&config.agent),
    );

    if let Some(msg) = message {
        // Single message mode
        if !run_printed(&agent, &mut conv, &msg).await? {
            return Err("Turn failed".into());
        }
        return Ok(());
    }

    println!();
    println!("  🎬 Cinemate: Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", agent.settings().model);
    println!("  Session:   {}", conv.id);
    println!();
    println!("  Ask about movies, showtimes, reviews or tickets.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        println!();
        // A failed turn was already reported; keep the session going
        run_printed(&agent, &mut conv, input).await?;
        println!();
    }

    println!();
    println!("  Goodbye! 🍿");
    println!();

    Ok(())
}

/// Run one turn while printing its events. Returns whether the turn succeeded.
async fn run_printed(
    agent: &AgentLoop,
    conv: &mut Conversation,
    text: &str,
) -> std::io::Result<bool> {
    let (tx, mut rx) = mpsc::channel::<AgentStreamEvent>(64);

    // `tx` moves into the turn so the channel closes when it ends
    let turn = async move { agent.run_turn(conv, text, &tx).await };
    let printer = async {
        let mut printer = DraftPrinter::new(std::io::stdout());
        while let Some(event) = rx.recv().await {
            printer.handle(&event)?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (outcome, printed) = tokio::join!(turn, printer);
    printed?;
    match outcome {
        Ok(outcome) => {
            tracing::debug!(
                generations = outcome.generations,
                calls_made = outcome.calls_made,
                "Turn finished"
            );
            Ok(true)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Turn failed");
            Ok(false)
        }
    }
}

/// Renders stream events, hiding drafts that turn out to be structured calls.
struct DraftPrinter<W: Write> {
    out: W,
    generation: usize,
    held: String,
    live: bool,
}

impl<W: Write> DraftPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            generation: 0,
            held: String::new(),
            live: false,
        }
    }

    fn handle(&mut self, event: &AgentStreamEvent) -> std::io::Result<()> {
        match event {
            AgentStreamEvent::Chunk {
                generation,
                content,
            } => {
                if *generation != self.generation {
                    self.reset();
                    self.generation = *generation;
                }
                if self.live {
                    write!(self.out, "{content}")?;
                } else {
                    self.held.push_str(content);
                    let start = self.held.trim_start();
                    if !start.is_empty() && !start.starts_with('{') {
                        write!(self.out, "{PREFIX}{start}")?;
                        self.held.clear();
                        self.live = true;
                    }
                }
                self.out.flush()?;
            }
            AgentStreamEvent::Discard { .. } => {
                if self.live {
                    writeln!(self.out)?;
                }
                self.reset();
            }
            AgentStreamEvent::Reply { content } => {
                if self.live {
                    writeln!(self.out)?;
                } else {
                    writeln!(self.out, "{PREFIX}{content}")?;
                }
                self.reset();
            }
            AgentStreamEvent::Done { .. } => {}
            AgentStreamEvent::Error { message } => {
                if self.live {
                    writeln!(self.out)?;
                }
                writeln!(self.out, "  [Error] {message}")?;
                self.reset();
            }
        }
        self.out.flush()
    }

    fn reset(&mut self) {
        self.held.clear();
        self.live = false;
    }
}
