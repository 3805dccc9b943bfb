//! Nyay Sahayak CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP gateway and web client
//! - `chat`     — Talk to the assistant from the terminal
//! - `onboard`  — Write a starter config file
//! - `fields`   — Print the form's field schedule
//! - `status`   — Show the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "nyay",
    about = "Nyay Sahayak — bilingual legal guidance and FIR intake assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway and web client
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat from the terminal (text only)
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing session instead of starting a new one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Write a starter configuration file
    Onboard,

    /// Print the configured form fields in interview order
    Fields,

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { message, session } => commands::chat::run(message, session).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Fields => commands::fields::run().await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
