//! Google Gemini native provider implementation.
//!
//! Uses the Generative Language API `generateContent` endpoint directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication (not Bearer)
//! - System prompt as top-level `systemInstruction`
//! - Assistant turns mapped to the `model` role
//! - Safety blocks surfaced as `ProviderError::Blocked`

use async_trait::async_trait;
use nyay_core::error::ProviderError;
use nyay_core::message::{Message, Role};
use nyay_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Build the request body. System messages become `systemInstruction`.
    fn to_api_request(request: &ProviderRequest) -> GenerateRequest {
        let mut system_parts: Vec<Part> = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(Part {
                    text: msg.content.clone(),
                }),
                Role::User => contents.push(Content {
                    role: Some("user".into()),
                    parts: vec![Part {
                        text: msg.content.clone(),
                    }],
                }),
                Role::Assistant => contents.push(Content {
                    role: Some("model".into()),
                    parts: vec![Part {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        GenerateRequest {
            contents,
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: system_parts,
                })
            },
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    /// Turn an API response into our domain response.
    fn from_api_response(
        api: GenerateResponse,
        requested_model: &str,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if let Some(reason) = api.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Blocked(reason));
        }

        let candidate = api
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No candidates in response".into(),
            })?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::Blocked("SAFETY".into()));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let usage = api.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage,
            model: api
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

#[async_trait]
impl nyay_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key missing (set GEMINI_API_KEY)".into(),
            ));
        }

        let url = self.endpoint(&request.model);
        let body = Self::to_api_request(&request);

        debug!(provider = %self.name, model = %request.model, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 10,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key or insufficient permissions".into(),
            ));
        }

        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::from_api_response(api_response, &request.model)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyay_core::Provider;

    #[test]
    fn endpoint_strips_models_prefix() {
        let p = GeminiProvider::new("key").with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(
            p.endpoint("models/gemini-1.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            p.endpoint("gemini-1.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn system_messages_become_system_instruction() {
        let request = ProviderRequest {
            model: "gemini-1.5-flash".into(),
            messages: vec![
                Message::system("You are Nyay Sahayak."),
                Message::user("What is an FIR?"),
                Message::assistant("A First Information Report."),
            ],
            temperature: 0.3,
            max_tokens: Some(256),
        };
        let body = serde_json::to_value(GeminiProvider::to_api_request(&request)).unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are Nyay Sahayak."
        );
        assert_eq!(body["contents"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn no_system_instruction_when_absent() {
        let request = ProviderRequest::prompt("gemini-1.5-flash", "hello");
        let body = serde_json::to_value(GeminiProvider::to_api_request(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn parse_text_response() {
        let api: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6},
            "modelVersion": "gemini-1.5-flash-002"
        }))
        .unwrap();

        let response = GeminiProvider::from_api_response(api, "gemini-1.5-flash").unwrap();
        assert_eq!(response.text(), "Hello there");
        assert_eq!(response.model, "gemini-1.5-flash-002");
        assert_eq!(response.usage.unwrap().total_tokens, 6);
    }

    #[test]
    fn blocked_prompt_is_error() {
        let api: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(matches!(
            GeminiProvider::from_api_response(api, "m"),
            Err(ProviderError::Blocked(_))
        ));
    }

    #[test]
    fn empty_candidates_is_error() {
        let api: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            GeminiProvider::from_api_response(api, "m"),
            Err(ProviderError::ApiError { .. })
        ));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let p = GeminiProvider::new("");
        let err = p
            .complete(ProviderRequest::prompt("gemini-1.5-flash", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
