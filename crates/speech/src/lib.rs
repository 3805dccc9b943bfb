//! Speech services for Nyay Sahayak.
//!
//! Spoken input is normalised with ffmpeg and transcribed through the
//! Bhashini ULCA pipeline; replies are synthesized back to Hindi audio.
//! Both directions implement `nyay_core::SpeechService`.

pub mod bhashini;
pub mod ffmpeg;

pub use bhashini::BhashiniClient;
pub use ffmpeg::AudioConverter;
