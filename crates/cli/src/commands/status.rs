//! `nyay status` — Show the effective configuration.

use nyay_config::AppConfig;

/// Every provider the config can build, default first.
fn provider_names(config: &AppConfig) -> String {
    let router = nyay_providers::router::build_from_config(config);
    let mut names = vec![config.default_provider.as_str()];
    names.extend(
        router
            .list()
            .into_iter()
            .filter(|name| *name != config.default_provider),
    );
    names.join(", ")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("⚖️  Nyay Sahayak Status");
    println!("======================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Provider:      {}", config.default_provider);
    println!("  Configured:    {}", provider_names(&config));
    println!("  Model:         {}", config.default_model);
    println!("  Temperature:   {}", config.default_temperature);
    if !config.fallback_providers.is_empty() {
        println!("  Fallbacks:     {}", config.fallback_providers.join(", "));
    }
    println!("  API key:       {}", yes_no(config.has_api_key()));
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Speech:        {} (credentials: {})",
        if config.speech.enabled { "enabled" } else { "disabled" },
        yes_no(config.speech.has_credentials())
    );
    println!("  Languages:     {} -> {}", config.speech.source_lang, config.speech.target_lang);
    println!("  Trigger:       \"{}\"", config.intake.trigger_phrase);
    println!("  Session TTL:   {}s", config.intake.session_ttl_secs);

    if AppConfig::config_path().exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `nyay onboard` first");
    }

    Ok(())
}
