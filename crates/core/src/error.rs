//! Error types for the Nyay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Nyay operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Speech errors ---
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    // --- Intake errors ---
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Response blocked by provider: {0}")]
    Blocked(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    #[error("Speech service not configured: {0}")]
    NotConfigured(String),

    #[error("Could not get {task} pipeline configuration: {reason}")]
    PipelineConfig { task: String, reason: String },

    #[error("Audio conversion failed: {0}")]
    Conversion(String),

    #[error("Audio converter not found: {0}")]
    ConverterMissing(String),

    #[error("Speech request failed: {0}")]
    Request(String),

    #[error("Malformed speech response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum IntakeError {
    #[error("Field schedule must declare at least one field")]
    EmptySchedule,

    #[error("Field schedule declares '{0}' more than once")]
    DuplicateField(String),

    #[error("Trigger phrase must not be blank")]
    BlankTrigger,

    #[error("Response generation failed: {0}")]
    Generation(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn speech_error_displays_task() {
        let err = Error::Speech(SpeechError::PipelineConfig {
            task: "asr".into(),
            reason: "missing serviceId".into(),
        });
        assert!(err.to_string().contains("asr"));
        assert!(err.to_string().contains("serviceId"));
    }

    #[test]
    fn generation_error_wraps_provider_error() {
        let err: IntakeError = ProviderError::Timeout("gemini".into()).into();
        assert!(matches!(err, IntakeError::Generation(ProviderError::Timeout(_))));
        assert!(err.to_string().contains("gemini"));
    }
}
