//! English to Hindi translation of replies.
//!
//! Form summaries carry a fenced JSON payload that clients parse, so the
//! payload must survive translation byte for byte. Such replies are split
//! into prose and payload and only the prose is sent for translation.

use crate::prompts;
use crate::responder::GenerationSettings;
use async_trait::async_trait;
use nyay_core::error::ProviderError;
use nyay_core::provider::Provider;
use std::sync::Arc;
use tracing::debug;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";
const RULE: &str = "---";

/// Shown in place of the Hindi reply when translation fails.
pub const TRANSLATION_FAILED_HI: &str = "अनुवाद में त्रुटि हुई।";

/// A reply split around its ```` ```json ```` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedReply<'a> {
    /// Prose before the fence, trimmed.
    pub intro: &'a str,
    /// Fence contents, trimmed.
    pub payload: &'a str,
    /// Text after the closing fence starting at `---`, if there is one.
    pub disclaimer: Option<&'a str>,
}

impl FencedReply<'_> {
    /// Put translated prose back around the untouched payload.
    pub fn reassemble(&self, intro: &str, disclaimer: Option<&str>) -> String {
        let mut out = format!("{intro}\n{JSON_FENCE}\n{}\n{FENCE}", self.payload);
        if let Some(d) = disclaimer {
            out.push('\n');
            out.push_str(d);
        }
        out
    }
}

/// Split `text` around its first ```` ```json ```` block. `None` when there
/// is no such block.
pub fn split_fenced(text: &str) -> Option<FencedReply<'_>> {
    let (intro, rest) = text.split_once(JSON_FENCE)?;
    let (payload, tail) = rest.split_once(FENCE).unwrap_or((rest, ""));
    let disclaimer = tail
        .find(RULE)
        .map(|at| tail[at..].trim())
        .filter(|d| !d.is_empty());

    Some(FencedReply {
        intro: intro.trim(),
        payload: payload.trim(),
        disclaimer,
    })
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn to_hindi(&self, english: &str) -> Result<String, ProviderError>;
}

/// [`Translator`] that asks an LLM provider.
pub struct LlmTranslator {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    async fn ask(&self, prompt: String) -> Result<String, ProviderError> {
        let response = self.provider.complete(self.settings.request(prompt)).await?;
        Ok(response.text().trim().to_string())
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn to_hindi(&self, english: &str) -> Result<String, ProviderError> {
        let Some(fenced) = split_fenced(english) else {
            return self.ask(prompts::translate_plain(english)).await;
        };

        debug!(
            payload_chars = fenced.payload.len(),
            "Translating summary prose around JSON payload"
        );
        let intro = if fenced.intro.is_empty() {
            String::new()
        } else {
            self.ask(prompts::translate_fragment(fenced.intro)).await?
        };
        let disclaimer = match fenced.disclaimer {
            Some(d) => Some(self.ask(prompts::translate_fragment(d)).await?),
            None => None,
        };

        Ok(fenced.reassemble(&intro, disclaimer.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;

    const SUMMARY: &str = "Here is your FIR summary.\n```json\n{\"fir_data\": [{\"label\": \"A\", \"value\": \"x\"}]}\n```\n---\n**Disclaimer:** not legal advice.";

    #[test]
    fn split_plain_text_is_none() {
        assert!(split_fenced("Just prose with --- a rule").is_none());
    }

    #[test]
    fn split_summary_into_parts() {
        let parts = split_fenced(SUMMARY).unwrap();
        assert_eq!(parts.intro, "Here is your FIR summary.");
        assert_eq!(
            parts.payload,
            "{\"fir_data\": [{\"label\": \"A\", \"value\": \"x\"}]}"
        );
        assert_eq!(parts.disclaimer, Some("---\n**Disclaimer:** not legal advice."));
    }

    #[test]
    fn split_without_disclaimer_or_closing_fence() {
        let parts = split_fenced("Intro\n```json\n{\"fir_data\": []}").unwrap();
        assert_eq!(parts.payload, "{\"fir_data\": []}");
        assert_eq!(parts.disclaimer, None);
    }

    #[test]
    fn reassemble_keeps_payload() {
        let parts = split_fenced(SUMMARY).unwrap();
        let out = parts.reassemble("सारांश", Some("--- अस्वीकरण"));
        assert_eq!(
            out,
            "सारांश\n```json\n{\"fir_data\": [{\"label\": \"A\", \"value\": \"x\"}]}\n```\n--- अस्वीकरण"
        );
    }

    #[tokio::test]
    async fn plain_text_is_one_request() {
        let provider = Arc::new(ScriptedProvider::new(["  नमस्ते  "]));
        let translator = LlmTranslator::new(provider.clone(), GenerationSettings::default());

        assert_eq!(translator.to_hindi("**Hello**").await.unwrap(), "नमस्ते");
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Do not translate markdown"));
        assert!(prompts[0].ends_with("**Hello**"));
    }

    #[tokio::test]
    async fn summary_translates_prose_only() {
        let provider = Arc::new(ScriptedProvider::new(["यह सारांश है।", "--- अस्वीकरण"]));
        let translator = LlmTranslator::new(provider.clone(), GenerationSettings::default());

        let hindi = translator.to_hindi(SUMMARY).await.unwrap();
        assert!(hindi.starts_with("यह सारांश है।\n```json\n"));
        assert!(hindi.contains("{\"fir_data\": [{\"label\": \"A\", \"value\": \"x\"}]}"));
        assert!(hindi.ends_with("```\n--- अस्वीकरण"));

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| !p.contains("fir_data")));
    }

    #[tokio::test]
    async fn failure_is_reported() {
        let translator =
            LlmTranslator::new(Arc::new(ScriptedProvider::failing()), GenerationSettings::default());
        assert!(translator.to_hindi("Hello").await.is_err());
    }
}
