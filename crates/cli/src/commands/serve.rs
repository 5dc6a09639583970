//! `cinemate serve`: Start the HTTP gateway.

use cinemate_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🎬 Cinemate Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", cinemate_providers::router::resolve_model(&config));
    println!(
        "   Purchase confirmation: {}",
        config.agent.require_purchase_confirmation
    );

    cinemate_gateway::start(config).await?;

    Ok(())
}
