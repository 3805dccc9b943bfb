//! Provider router — builds LLM providers from config and picks the one the
//! intake flow talks to.

use std::collections::HashMap;
use std::sync::Arc;

use nyay_core::provider::Provider;

use crate::fallback::FallbackProvider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Named providers plus the name of the default one.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// All registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build one provider by name.
fn build_provider(
    name: &str,
    api_key: String,
    api_url: Option<String>,
) -> Arc<dyn Provider> {
    match name {
        "gemini" | "google" => {
            let mut p = GeminiProvider::new(api_key);
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        _ => {
            let base_url = api_url.unwrap_or_else(|| default_base_url(name));
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
        }
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` entry is registered, and the default provider
/// is always present even when not configured explicitly.
pub fn build_from_config(config: &nyay_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        router.register(
            name.clone(),
            build_provider(name, api_key, provider_config.api_url.clone()),
        );
    }

    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        router.register(
            config.default_provider.clone(),
            build_provider(&config.default_provider, api_key, None),
        );
    }

    router
}

/// The provider the intake flow should use: the default provider alone, or
/// the default followed by `fallback_providers` as a [`FallbackProvider`].
///
/// Fallback providers use their own `default_model` when configured.
pub fn build_primary(config: &nyay_config::AppConfig) -> Option<Arc<dyn Provider>> {
    let router = build_from_config(config);
    let primary = router.default()?;

    if config.fallback_providers.is_empty() {
        return Some(primary);
    }

    let mut chain = FallbackProvider::new("fallback").then(primary);
    for name in &config.fallback_providers {
        let provider = match router.get(name) {
            Some(p) => p,
            None => {
                tracing::warn!(provider = %name, "Fallback provider not configured, skipping");
                continue;
            }
        };
        let model = config
            .providers
            .get(name)
            .and_then(|p| p.default_model.clone());
        chain = chain.then_with(provider, model, std::time::Duration::from_secs(120));
    }

    Some(Arc::new(chain))
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
