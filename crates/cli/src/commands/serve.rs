//! `hydra serve`: Start the HTTP gateway.

use hydra_config::AppConfig;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!();
    println!("  Hydra Gateway");
    println!("  Listening on http://{}:{}", config.gateway.host, config.gateway.port);
    println!("  Store backend: {}", config.store.backend);
    println!();

    hydra_gateway::start(config).await?;
    Ok(())
}
