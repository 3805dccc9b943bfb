//! HTTP gateway for Nyay Sahayak.
//!
//! Serves the chat endpoint that the web client talks to, a health check,
//! and the embedded frontend. Spoken input is transcribed here before the
//! intake dispatcher ever sees it, and Hindi replies are synthesized back
//! to audio on the way out.
//!
//! Built on Axum.

pub mod chat;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::{
    Extension, Router,
    http::{HeaderName, HeaderValue, Method, header},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use nyay_core::speech::SpeechService;
use nyay_intake::{InMemorySessionStore, TurnDispatcher};

/// How often expired sessions are swept from the store.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state for the gateway.
pub struct GatewayState {
    pub dispatcher: Arc<TurnDispatcher>,
    /// `None` when speech is disabled or Bhashini is not configured.
    pub speech: Option<Arc<dyn SpeechService>>,
    pub source_lang: String,
    pub target_lang: String,
}

impl GatewayState {
    pub fn new(dispatcher: Arc<TurnDispatcher>, speech: Option<Arc<dyn SpeechService>>) -> Self {
        let defaults = nyay_config::SpeechConfig::default();
        Self {
            dispatcher,
            speech,
            source_lang: defaults.source_lang,
            target_lang: defaults.target_lang,
        }
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_lang = source.into();
        self.target_lang = target.into();
        self
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit from `[gateway] max_body_bytes`
/// - Per-session rate limiting on POST routes (checked by the handlers once
///   the session is known)
/// - CORS for `[gateway] allowed_origins`, if any
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &nyay_config::GatewayConfig) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(
        gateway.rate_limit_per_minute,
        Duration::from_secs(60),
    ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat::chat_handler))
        .route("/session/reset", post(chat::reset_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes))
        .layer(Extension(rate_limiter));

    let router = match cors_layer(&gateway.allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the configured origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(chat::SESSION_HEADER)])
            .expose_headers([HeaderName::from_static(chat::SESSION_HEADER)])
            .max_age(Duration::from_secs(3600)),
    )
}

/// Build the speech service from config, if it can be.
fn build_speech(config: &nyay_config::SpeechConfig) -> Option<Arc<dyn SpeechService>> {
    if !config.enabled {
        info!("Speech disabled in config, voice input will be rejected");
        return None;
    }
    match nyay_speech::BhashiniClient::from_config(config) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "Speech unavailable, continuing with text only");
            None
        }
    }
}

/// Start the gateway HTTP server.
pub async fn start(config: nyay_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() {
        warn!("No API key configured, replies will fail until one is set (NYAY_API_KEY or GEMINI_API_KEY)");
    }
    let provider = nyay_providers::router::build_primary(&config)
        .ok_or("No default provider configured, check default_provider in config.toml")?;

    let store = Arc::new(InMemorySessionStore::from_config(&config.intake));
    let dispatcher = Arc::new(TurnDispatcher::from_config(&config, provider, store.clone())?);

    let purge_store = store.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            purge_store.purge_expired().await;
        }
    });

    let state = Arc::new(
        GatewayState::new(dispatcher, build_speech(&config.speech))
            .with_languages(&config.speech.source_lang, &config.speech.target_lang),
    );
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        provider = %config.default_provider,
        model = %config.default_model,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per session key.
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
pub(crate) struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<std::time::Instant>>>,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    pub(crate) fn check(&self, client_key: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let now = std::time::Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
