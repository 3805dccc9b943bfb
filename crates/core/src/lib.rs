//! # Nyay Core
//!
//! Domain types, traits, and error definitions for the Nyay Sahayak intake
//! assistant. This crate has **zero framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] — an LLM backend (legal guidance, form prompts, translation)
//! - [`SpeechService`] — speech-to-text and text-to-speech
//! - [`SessionStore`] — per-conversation form state
//!
//! Implementations live in their respective crates, so the form state machine
//! can be tested against mocks without any network access.

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod speech;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IntakeError, ProviderError, Result, SpeechError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use session::{CollectedFields, FieldEntry, SessionKey, SessionState, SessionStore};
pub use speech::{SpeechService, Transcript};
