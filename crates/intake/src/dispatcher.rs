//! Turn dispatcher — runs one utterance through the form state machine and
//! the responders.
//!
//! The manager plans the turn, the responder writes the reply, and only then
//! is the new state committed. A failed generation therefore leaves the
//! session exactly where it was and the user can simply answer again.

use crate::manager::{Directive, FormSessionManager};
use crate::responder::{GenerationSettings, LlmResponder, PromptKind, Responder};
use crate::store::TurnLocks;
use crate::summary::ensure_payload;
use crate::translate::{LlmTranslator, Translator, TRANSLATION_FAILED_HI};
use nyay_core::error::IntakeError;
use nyay_core::provider::Provider;
use nyay_core::session::{CollectedFields, SessionKey, SessionStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shown when a form prompt could not be generated.
pub const FORM_ERROR_EN: &str = "Sorry, I encountered an error. Let's try again.";

/// Shown when a guidance answer could not be generated.
pub const GUIDANCE_ERROR_EN: &str = "Sorry, I encountered an error trying to process your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    FormStarted,
    FormContinued,
    FormFinalized,
    Guidance,
}

impl TurnKind {
    fn of(directive: &Directive) -> Self {
        match directive {
            Directive::AskField { index: 0, .. } => Self::FormStarted,
            Directive::AskField { .. } => Self::FormContinued,
            Directive::Finalize { .. } => Self::FormFinalized,
            Directive::Passthrough { .. } => Self::Guidance,
        }
    }

    pub fn is_form(&self) -> bool {
        !matches!(self, Self::Guidance)
    }
}

impl std::fmt::Display for TurnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FormStarted => "form_started",
            Self::FormContinued => "form_continued",
            Self::FormFinalized => "form_finalized",
            Self::Guidance => "guidance",
        };
        f.write_str(s)
    }
}

/// The result of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub kind: TurnKind,
    pub english: String,
    pub hindi: String,
    /// The completed answers, on the finalizing turn only.
    pub fir_data: Option<CollectedFields>,
    /// Whether the session is collecting answers after this turn.
    pub form_active: bool,
}

impl TurnOutcome {
    /// Spoken replies accompany spoken input and every form turn that leaves
    /// the form open.
    pub fn wants_audio(&self, input_was_audio: bool) -> bool {
        input_was_audio || self.form_active
    }
}

/// A turn whose reply could not be generated. The session state is as it
/// was before the turn.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} turn failed: {source}")]
pub struct TurnError {
    pub kind: TurnKind,
    #[source]
    pub source: IntakeError,
}

impl TurnError {
    /// The English text to show the user instead of a reply.
    pub fn fallback_message(&self) -> &'static str {
        if self.kind.is_form() {
            FORM_ERROR_EN
        } else {
            GUIDANCE_ERROR_EN
        }
    }
}

pub struct TurnDispatcher {
    manager: FormSessionManager,
    store: Arc<dyn SessionStore>,
    responder: Arc<dyn Responder>,
    translator: Arc<dyn Translator>,
    locks: TurnLocks,
}

impl TurnDispatcher {
    pub fn new(
        manager: FormSessionManager,
        store: Arc<dyn SessionStore>,
        responder: Arc<dyn Responder>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            manager,
            store,
            responder,
            translator,
            locks: TurnLocks::new(),
        }
    }

    /// Wire a dispatcher whose replies and translations both come from
    /// `provider`, with the schedule and trigger from `config`.
    pub fn from_config(
        config: &nyay_config::AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, IntakeError> {
        let manager = FormSessionManager::from_config(&config.intake)?;
        let settings = GenerationSettings::from_config(config);
        let responder = Arc::new(LlmResponder::new(provider.clone(), settings.clone()));
        let translator = Arc::new(LlmTranslator::new(provider, settings));
        Ok(Self::new(manager, store, responder, translator))
    }

    pub fn manager(&self) -> &FormSessionManager {
        &self.manager
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Process one utterance for `key`.
    ///
    /// Turns for the same key are serialised; different keys run
    /// concurrently.
    pub async fn dispatch(&self, key: &SessionKey, utterance: &str) -> Result<TurnOutcome, TurnError> {
        let _turn = self.locks.lock(key).await;

        let state = self.store.get_or_create(key).await;
        let transition = self.manager.advance(&state, utterance);
        let kind = TurnKind::of(&transition.directive);
        debug!(
            session = %key,
            kind = %kind,
            chars = utterance.len(),
            cursor = state.cursor(),
            "Planned turn"
        );

        let (prompt, fir_data) = match transition.directive {
            Directive::AskField { field, index: 0, .. } => {
                (PromptKind::StartForm { first_field: field }, None)
            }
            Directive::AskField {
                field,
                index,
                context_so_far,
            } => {
                debug!(session = %key, field = %field, index, "Asking next field");
                (
                    PromptKind::NextField {
                        field,
                        collected: context_so_far,
                    },
                    None,
                )
            }
            Directive::Finalize { collected } => (
                PromptKind::Finalize {
                    collected: collected.clone(),
                },
                Some(collected),
            ),
            Directive::Passthrough { utterance } => (PromptKind::Guidance { query: utterance }, None),
        };

        let english = match self.responder.respond(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(session = %key, kind = %kind, error = %e, "Reply generation failed, state kept");
                return Err(TurnError {
                    kind,
                    source: IntakeError::Generation(e),
                });
            }
        };
        let english = match &fir_data {
            Some(collected) => ensure_payload(english, collected),
            None => english,
        };

        let form_active = transition.next.is_active();
        self.store.put(key, transition.next).await;
        info!(session = %key, kind = %kind, form_active, "Turn committed");

        let hindi = self.translate(&english).await;

        Ok(TurnOutcome {
            kind,
            english,
            hindi,
            fir_data,
            form_active,
        })
    }

    /// Hindi rendering of `english`, or a fixed Hindi error line.
    pub async fn translate(&self, english: &str) -> String {
        match self.translator.to_hindi(english).await {
            Ok(hindi) => hindi,
            Err(e) => {
                warn!(error = %e, "Translation failed");
                TRANSLATION_FAILED_HI.to_string()
            }
        }
    }

    /// Abandon any form in progress for `key`.
    pub async fn reset(&self, key: &SessionKey) {
        let _turn = self.locks.lock(key).await;
        self.store.reset(key).await;
        info!(session = %key, "Session reset");
    }
}
