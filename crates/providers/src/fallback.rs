//! Provider fallback — ordered retry chain with per-provider timeouts.
//!
//! When a provider fails (timeout, rate limit, error), the next provider in
//! the chain is tried. Providers rarely share model names, so each entry may
//! carry its own model that replaces the one in the request.

use async_trait::async_trait;
use nyay_core::error::ProviderError;
use nyay_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<ChainLink>,
}

struct ChainLink {
    provider: Arc<dyn nyay_core::Provider>,
    model: Option<String>,
    timeout: Duration,
}

impl FallbackProvider {
    /// Create a new fallback provider with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append a provider that keeps the request's model.
    pub fn then(self, provider: Arc<dyn nyay_core::Provider>) -> Self {
        self.then_with(provider, None, DEFAULT_TIMEOUT)
    }

    /// Append a provider with its own model override and timeout.
    pub fn then_with(
        mut self,
        provider: Arc<dyn nyay_core::Provider>,
        model: Option<String>,
        timeout: Duration,
    ) -> Self {
        self.chain.push(ChainLink {
            provider,
            model,
            timeout,
        });
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl nyay_core::Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("fallback chain is empty".into());

        for (position, link) in self.chain.iter().enumerate() {
            let mut attempt = request.clone();
            if let Some(model) = &link.model {
                attempt.model = model.clone();
            }

            info!(
                chain = %self.name,
                provider = %link.provider.name(),
                model = %attempt.model,
                position = position + 1,
                of = self.chain.len(),
                "Fallback attempt"
            );

            last_error = match tokio::time::timeout(link.timeout, link.provider.complete(attempt)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(provider = %link.provider.name(), error = %e, "Provider failed");
                    e
                }
                Err(_) => {
                    warn!(
                        provider = %link.provider.name(),
                        timeout_secs = link.timeout.as_secs(),
                        "Provider timed out"
                    );
                    ProviderError::Timeout(format!(
                        "{} gave no answer within {}s",
                        link.provider.name(),
                        link.timeout.as_secs()
                    ))
                }
            };
        }

        Err(last_error)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        for link in &self.chain {
            if let Ok(true) = link.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
