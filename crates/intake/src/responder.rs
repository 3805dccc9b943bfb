//! Responder — turns a planned turn into English text.

use crate::prompts;
use async_trait::async_trait;
use nyay_core::error::ProviderError;
use nyay_core::provider::{Provider, ProviderRequest};
use nyay_core::session::CollectedFields;
use std::sync::Arc;
use tracing::debug;

/// What the reply should be about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// The form was just triggered; ask for the first field.
    StartForm { first_field: String },

    /// Ask for `field`, given the answers so far.
    NextField {
        field: String,
        collected: CollectedFields,
    },

    /// Summarise the completed form.
    Finalize { collected: CollectedFields },

    /// Free-form legal question.
    Guidance { query: String },
}

impl PromptKind {
    pub fn render(&self) -> String {
        match self {
            Self::StartForm { first_field } => prompts::form_start(first_field),
            Self::NextField { field, collected } => prompts::form_continue(field, collected),
            Self::Finalize { collected } => prompts::form_finalize(collected),
            Self::Guidance { query } => prompts::legal_guidance(query),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StartForm { .. } => "start_form",
            Self::NextField { .. } => "next_field",
            Self::Finalize { .. } => "finalize",
            Self::Guidance { .. } => "guidance",
        }
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, kind: PromptKind) -> Result<String, ProviderError>;
}

/// Model parameters shared by every request the intake flow sends.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    pub fn from_config(config: &nyay_config::AppConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
        }
    }

    pub(crate) fn request(&self, prompt: String) -> ProviderRequest {
        ProviderRequest::prompt(&self.model, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&nyay_config::AppConfig::default())
    }
}

/// [`Responder`] backed by an LLM provider.
pub struct LlmResponder {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl LlmResponder {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn respond(&self, kind: PromptKind) -> Result<String, ProviderError> {
        let request = self.settings.request(kind.render());
        let response = self.provider.complete(request).await?;
        debug!(
            prompt = kind.label(),
            provider = self.provider.name(),
            model = %response.model,
            chars = response.text().len(),
            "Generated reply"
        );
        Ok(response.text().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;

    #[test]
    fn render_picks_matching_prompt() {
        let mut collected = CollectedFields::new();
        collected.insert("A", "x");

        assert!(PromptKind::StartForm { first_field: "A".into() }.render().contains("\"A\""));
        assert!(PromptKind::NextField { field: "B".into(), collected: collected.clone() }
            .render()
            .contains("- A: x"));
        assert!(PromptKind::Finalize { collected }.render().contains("fir_data"));
        assert!(PromptKind::Guidance { query: "bail?".into() }.render().contains("bail?"));
    }

    #[tokio::test]
    async fn llm_responder_sends_configured_model() {
        let provider = Arc::new(ScriptedProvider::new(["Please tell me your name."]));
        let settings = GenerationSettings {
            model: "gemini-test".into(),
            temperature: 0.2,
            max_tokens: Some(64),
        };
        let responder = LlmResponder::new(provider.clone(), settings);

        let text = responder
            .respond(PromptKind::StartForm { first_field: "Complainant's Name".into() })
            .await
            .unwrap();
        assert_eq!(text, "Please tell me your name.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-test");
        assert_eq!(requests[0].max_tokens, Some(64));
        assert!(requests[0].messages[0].content.contains("Complainant's Name"));
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let provider = Arc::new(ScriptedProvider::failing());
        let responder = LlmResponder::new(provider, GenerationSettings::default());
        let err = responder
            .respond(PromptKind::Guidance { query: "q".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
