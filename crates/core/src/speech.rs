//! Speech trait — speech-to-text and text-to-speech.
//!
//! The form state machine never sees audio; the gateway transcribes spoken
//! input before dispatching and synthesizes the Hindi reply afterwards.

use async_trait::async_trait;
use crate::error::SpeechError;

/// The outcome of a transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognised speech.
    Text(String),
    /// The service returned nothing usable (silence, noise).
    Empty,
}

impl Transcript {
    /// Build a transcript from raw service output, mapping blank text to `Empty`.
    pub fn from_raw(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(text)
        }
    }
}

/// The core SpeechService trait.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// A human-readable name for this service (e.g., "bhashini").
    fn name(&self) -> &str;

    /// Transcribe audio bytes (any container ffmpeg understands) spoken in
    /// `source_lang` (ISO 639-1, e.g. "en").
    async fn transcribe(
        &self,
        audio: &[u8],
        source_lang: &str,
    ) -> std::result::Result<Transcript, SpeechError>;

    /// Synthesize `text` in `target_lang`, returning base64-encoded WAV audio.
    async fn synthesize(
        &self,
        text: &str,
        target_lang: &str,
    ) -> std::result::Result<String, SpeechError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_empty_transcript() {
        assert_eq!(Transcript::from_raw("   \n"), Transcript::Empty);
        assert_eq!(
            Transcript::from_raw("fill fir form"),
            Transcript::Text("fill fir form".into())
        );
    }
}
