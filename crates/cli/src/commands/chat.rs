//! `nyay chat` — Interactive or single-message chat from the terminal.
//!
//! Runs the same dispatcher as the gateway, text only. `/reset` abandons
//! the current form; `exit` or Ctrl+D quits.

use nyay_config::AppConfig;
use nyay_core::session::{CollectedFields, SessionKey, SessionStore};
use nyay_intake::{InMemorySessionStore, TurnDispatcher};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...   (Google Gemini, the default provider)");
        eprintln!("    OPENAI_API_KEY=...   (with NYAY_PROVIDER=openai)");
        eprintln!("    NYAY_API_KEY=...     (generic)");
        eprintln!();
        eprintln!("  Or add api_key to {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = nyay_providers::router::build_primary(&config)
        .ok_or("No default provider configured")?;
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::from_config(&config.intake));
    let dispatcher = TurnDispatcher::from_config(&config, provider, store)?;
    let key = session
        .map(SessionKey)
        .unwrap_or_else(SessionKey::generate);

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = turn(&dispatcher, &key, &msg).await;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Nyay Sahayak — Interactive Mode       ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Session:   {key}");
    println!();
    println!(
        "  Ask a legal question, or type '{}' to start the form.",
        dispatcher.manager().trigger().as_str()
    );
    println!("  Type '/reset' to abandon a form, 'exit' or Ctrl+D to quit.");
    println!();

    repl(&dispatcher, &key, BufReader::new(tokio::io::stdin())).await?;

    println!();
    println!("  Goodbye! 🙏");
    println!();
    Ok(())
}

/// Read lines from `input` until EOF or `exit`, printing each reply.
async fn repl<R>(
    dispatcher: &TurnDispatcher,
    key: &SessionKey,
    input: R,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "exit" | "quit" => break,
            "/reset" => {
                dispatcher.reset(key).await;
                println!("  (form cleared)");
                println!();
            }
            _ => {
                eprint!("  ...");
                let reply = turn(dispatcher, key, line).await;
                eprint!("\r     \r");
                println!();
                println!("{reply}");
            }
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Run one turn and render it for the terminal.
async fn turn(dispatcher: &TurnDispatcher, key: &SessionKey, utterance: &str) -> String {
    match dispatcher.dispatch(key, utterance).await {
        Ok(outcome) => render(&outcome.english, &outcome.hindi, outcome.fir_data.as_ref()),
        Err(e) => {
            tracing::debug!(error = %e, "Turn failed");
            let english = e.fallback_message();
            let hindi = dispatcher.translate(english).await;
            render(english, &hindi, None)
        }
    }
}

fn render(english: &str, hindi: &str, fir_data: Option<&CollectedFields>) -> String {
    let mut out = String::new();
    for line in english.lines() {
        out.push_str(&format!("  Nyay  > {line}\n"));
    }
    for line in hindi.lines() {
        out.push_str(&format!("  हिंदी > {line}\n"));
    }
    if let Some(fields) = fir_data {
        out.push_str("\n  ── Demonstration FIR ──\n");
        let width = fields.labels().map(|l| l.chars().count()).max().unwrap_or(0);
        for entry in fields {
            let pad = width.saturating_sub(entry.label.chars().count());
            out.push_str(&format!(
                "  {}{} : {}\n",
                entry.label,
                " ".repeat(pad),
                entry.value
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyay_core::error::ProviderError;
    use nyay_core::session::SessionState;
    use nyay_intake::{FormSessionManager, PromptKind, Responder, Translator};

    /// Replies with the prompt kind; "translates" by echoing.
    struct Echo;

    #[async_trait::async_trait]
    impl Responder for Echo {
        async fn respond(&self, kind: PromptKind) -> Result<String, ProviderError> {
            Ok(kind.label().to_string())
        }
    }

    #[async_trait::async_trait]
    impl Translator for Echo {
        async fn to_hindi(&self, english: &str) -> Result<String, ProviderError> {
            Ok(english.to_string())
        }
    }

    fn echo_dispatcher() -> (TurnDispatcher, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::default());
        let dispatcher = TurnDispatcher::new(
            FormSessionManager::default(),
            store.clone(),
            Arc::new(Echo),
            Arc::new(Echo),
        );
        (dispatcher, store)
    }

    #[tokio::test]
    async fn repl_processes_lines_until_exit() {
        let (dispatcher, store) = echo_dispatcher();
        let key = SessionKey::from("cli");

        let input: &[u8] = b"fill fir form\nRavi\nexit\n/reset\n";
        repl(&dispatcher, &key, input).await.unwrap();

        // `/reset` came after `exit`, so the form is still open.
        let state = store.get_or_create(&key).await;
        assert_eq!(state.cursor(), 1);
        assert_eq!(state.collected().and_then(|c| c.get("Complainant's Name")), Some("Ravi"));
    }

    #[tokio::test]
    async fn repl_reset_clears_form() {
        let (dispatcher, store) = echo_dispatcher();
        let key = SessionKey::from("cli");

        let input: &[u8] = b"fill fir form\n\nRavi\n/reset\n";
        repl(&dispatcher, &key, input).await.unwrap();
        assert_eq!(store.get_or_create(&key).await, SessionState::Idle);
    }

    #[tokio::test]
    async fn turn_renders_reply() {
        let (dispatcher, _) = echo_dispatcher();
        let out = turn(&dispatcher, &SessionKey::from("cli"), "What is bail?").await;
        assert_eq!(out, "  Nyay  > guidance\n  हिंदी > guidance\n");
    }

    #[test]
    fn render_prefixes_each_line() {
        let out = render("Line one\nLine two", "पंक्ति", None);
        assert_eq!(
            out,
            "  Nyay  > Line one\n  Nyay  > Line two\n  हिंदी > पंक्ति\n"
        );
    }

    #[test]
    fn render_aligns_fir_table() {
        let mut fields = CollectedFields::new();
        fields.insert("Name", "Ravi");
        fields.insert("Place of Occurrence", "Pune");
        let out = render("Done", "हो गया", Some(&fields));
        assert!(out.contains("Demonstration FIR"));
        assert!(out.contains("  Name                : Ravi\n"));
        assert!(out.contains("  Place of Occurrence : Pune\n"));
    }
}
