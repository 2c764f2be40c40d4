//! `folio serve` — Start the HTTP API server.

use folio_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Folio Gateway");
    println!("   Listening:   {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Idle TTL:    {}s (sweep every {}s)",
        config.store.idle_ttl_secs, config.store.sweep_interval_secs
    );

    folio_gateway::start(config).await?;

    Ok(())
}
