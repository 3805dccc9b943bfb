//! The FIR intake flow of Nyay Sahayak.
//!
//! Each turn is one user utterance:
//!
//! 1. **Look up** the conversation's [`SessionState`](nyay_core::SessionState)
//! 2. **Advance** the [`FormSessionManager`] state machine, which yields a [`Directive`]
//! 3. **Generate** English text for that directive via a [`Responder`]
//! 4. **Commit** the new state (only if generation succeeded)
//! 5. **Translate** the reply to Hindi via a [`Translator`]
//!
//! The state machine itself is pure and synchronous; everything that talks
//! to the network sits behind a trait.

pub mod dispatcher;
pub mod manager;
pub mod prompts;
pub mod responder;
pub mod schedule;
pub mod store;
pub mod summary;
pub mod translate;

#[cfg(test)]
mod test_support;

pub use dispatcher::{TurnDispatcher, TurnError, TurnKind, TurnOutcome};
pub use manager::{Directive, FormSessionManager, Transition, TriggerPhrase};
pub use responder::{GenerationSettings, LlmResponder, PromptKind, Responder};
pub use schedule::FieldSchedule;
pub use store::{InMemorySessionStore, TurnLocks};
pub use summary::FirSummary;
pub use translate::{LlmTranslator, Translator};
