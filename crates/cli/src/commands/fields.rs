//! `nyay fields` — Print the form's field schedule.

use nyay_config::AppConfig;
use nyay_intake::FormSessionManager;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let manager = FormSessionManager::from_config(&config.intake)?;

    println!("Trigger phrase: \"{}\"", manager.trigger().as_str());
    println!();
    for (i, field) in manager.schedule().iter().enumerate() {
        println!("  {:>2}. {field}", i + 1);
    }
    if config.intake.fields.is_empty() {
        println!("\n  (built-in FIR schedule; override with [intake] fields in config.toml)");
    }

    Ok(())
}
