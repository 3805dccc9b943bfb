//! `nyay serve` — Start the HTTP gateway.

use nyay_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("⚖️  Nyay Sahayak Gateway");
    println!("   Open:    http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Model:   {} ({})", config.default_model, config.default_provider);
    println!(
        "   Speech:  {}",
        if config.speech.enabled && config.speech.has_credentials() {
            "Bhashini"
        } else {
            "off (text only)"
        }
    );

    nyay_gateway::start(config).await?;

    Ok(())
}
