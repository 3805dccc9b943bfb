//! Configuration loading, validation, and management for Nyay Sahayak.
//!
//! Loads configuration from `~/.nyay/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The phrase that starts the form-filling flow. Clients depend on it.
pub const DEFAULT_TRIGGER_PHRASE: &str = "fill fir form";

/// The root configuration structure.
///
/// Maps directly to `~/.nyay/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Providers tried in order when the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Speech (ASR/TTS) configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Form intake configuration
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("fallback_providers", &self.fallback_providers)
            .field("gateway", &self.gateway)
            .field("speech", &self.speech)
            .field("intake", &self.intake)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("enabled", &self.enabled)
            .field("user_id", &self.user_id)
            .field("ulca_api_key", &redact(&self.ulca_api_key))
            .field("pipeline_id", &self.pipeline_id)
            .field("pipeline_config_url", &self.pipeline_config_url)
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Request body limit; audio uploads need headroom.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Requests allowed per session per minute (0 = unlimited)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,

    /// Extra origins allowed to call the API cross-origin. Empty keeps the
    /// gateway same-origin only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_rate_limit() -> usize {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
            rate_limit_per_minute: default_rate_limit(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Whether spoken input/output is available at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ulca_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,

    #[serde(default = "default_pipeline_config_url")]
    pub pipeline_config_url: String,

    /// Language of spoken input
    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    /// Language of synthesized replies
    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_pipeline_config_url() -> String {
    "https://meity-auth.ulcacontrib.org/ulca/apis/v0/model/getModelsPipeline".into()
}
fn default_source_lang() -> String {
    "en".into()
}
fn default_target_lang() -> String {
    "hi".into()
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}
fn default_speech_timeout() -> u64 {
    60
}

impl SpeechConfig {
    /// Whether all Bhashini credentials are present.
    pub fn has_credentials(&self) -> bool {
        self.user_id.is_some() && self.ulca_api_key.is_some() && self.pipeline_id.is_some()
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_id: None,
            ulca_api_key: None,
            pipeline_id: None,
            pipeline_config_url: default_pipeline_config_url(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Utterance that starts (or restarts) the form, matched
    /// case- and surrounding-whitespace-insensitively
    #[serde(default = "default_trigger_phrase")]
    pub trigger_phrase: String,

    /// Override the built-in FIR field list (empty = built-in)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    /// Idle sessions older than this are forgotten
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Upper bound on tracked sessions; least recently seen is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_trigger_phrase() -> String {
    DEFAULT_TRIGGER_PHRASE.into()
}
fn default_session_ttl() -> u64 {
    3600
}
fn default_max_sessions() -> usize {
    10_000
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            trigger_phrase: default_trigger_phrase(),
            fields: vec![],
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.nyay/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// API key (first match wins, only if not set in the file):
    /// - `NYAY_API_KEY`
    /// - `GEMINI_API_KEY`
    /// - `OPENAI_API_KEY`
    ///
    /// Always override when present: `NYAY_PROVIDER`, `NYAY_MODEL`,
    /// `BHASHINI_USER_ID`, `BHASHINI_ULCA_API_KEY`, `BHASHINI_PIPELINE_ID`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("NYAY_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("NYAY_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("NYAY_MODEL") {
            self.default_model = model;
        }

        if let Some(user_id) = lookup("BHASHINI_USER_ID") {
            self.speech.user_id = Some(user_id);
        }
        if let Some(key) = lookup("BHASHINI_ULCA_API_KEY") {
            self.speech.ulca_api_key = Some(key);
        }
        if let Some(pipeline) = lookup("BHASHINI_PIPELINE_ID") {
            self.speech.pipeline_id = Some(pipeline);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".nyay")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.intake.trigger_phrase.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "intake.trigger_phrase must not be blank".into(),
            ));
        }

        if self.intake.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "intake.max_sessions must be > 0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.intake.fields {
            if !seen.insert(field.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "intake.fields lists '{field}' more than once"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            fallback_providers: vec![],
            gateway: GatewayConfig::default(),
            speech: SpeechConfig::default(),
            intake: IntakeConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
