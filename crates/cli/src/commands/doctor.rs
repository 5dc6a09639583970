//! `cinemate doctor`: Diagnose configuration and provider health.

use cinemate_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Cinemate Doctor: Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file: using defaults (run `cinemate onboard` to create one)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    println!(
        "  ✅ Provider: {} (model {})",
        config.default_provider,
        cinemate_providers::router::resolve_model(&config)
    );

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else if config.default_provider == "ollama" {
        println!("  ✅ No API key needed for ollama");
    } else {
        println!("  ⚠️  No API key: set OPENAI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    match cinemate_providers::build_from_config(&config).default_provider() {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ❌ Provider '{}' answered but is not healthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    let registry = cinemate_movies::default_registry(
        std::sync::Arc::new(cinemate_movies::MovieCatalog::default()),
        std::sync::Arc::new(cinemate_movies::BookingLedger::new()),
        config.agent.require_purchase_confirmation,
    );
    let names: Vec<&str> = registry.kinds().iter().map(|k| k.wire_name()).collect();
    println!("  ✅ Capabilities: {}", names.join(", "));

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
