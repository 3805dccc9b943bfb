//! `nyay onboard` — First-time setup.

use nyay_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("⚖️  Nyay Sahayak — First-Time Setup");
    println!("===================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set GEMINI_API_KEY (or api_key in {})", config_path.display());
    println!("   2. Optional, for voice: set BHASHINI_USER_ID, BHASHINI_ULCA_API_KEY");
    println!("      and BHASHINI_PIPELINE_ID, and install ffmpeg");
    println!("   3. Run: nyay serve   (web client)  or  nyay chat   (terminal)\n");

    Ok(())
}
