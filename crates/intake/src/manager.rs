//! Form session manager: the pure state machine behind the intake flow.
//!
//! Given the current [`SessionState`] and one utterance it decides the next
//! state and what the responder should do. It performs no I/O, so a turn can
//! be planned first and committed only once the reply exists.

use crate::schedule::FieldSchedule;
use nyay_core::error::IntakeError;
use nyay_core::session::{CollectedFields, SessionState};

/// The phrase that starts (or restarts) the form, compared after trimming
/// and lowercasing the utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerPhrase(String);

impl TriggerPhrase {
    pub fn new(phrase: &str) -> Result<Self, IntakeError> {
        let normalized = phrase.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(IntakeError::BlankTrigger);
        }
        Ok(Self(normalized))
    }

    pub fn matches(&self, utterance: &str) -> bool {
        utterance.trim().to_lowercase() == self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TriggerPhrase {
    fn default() -> Self {
        Self(nyay_config::DEFAULT_TRIGGER_PHRASE.to_string())
    }
}

/// What the responder should produce for this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Ask for `field`. `index` is its position in the schedule.
    AskField {
        field: String,
        index: usize,
        context_so_far: CollectedFields,
    },

    /// Every field has an answer; summarise them.
    Finalize { collected: CollectedFields },

    /// Not part of the form; answer as free-form guidance.
    Passthrough { utterance: String },
}

/// The outcome of [`FormSessionManager::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub directive: Directive,
}

#[derive(Debug, Clone)]
pub struct FormSessionManager {
    schedule: FieldSchedule,
    trigger: TriggerPhrase,
}

impl FormSessionManager {
    pub fn new(schedule: FieldSchedule, trigger: TriggerPhrase) -> Self {
        Self { schedule, trigger }
    }

    pub fn from_config(config: &nyay_config::IntakeConfig) -> Result<Self, IntakeError> {
        Ok(Self::new(
            FieldSchedule::from_config(config)?,
            TriggerPhrase::new(&config.trigger_phrase)?,
        ))
    }

    pub fn schedule(&self) -> &FieldSchedule {
        &self.schedule
    }

    pub fn trigger(&self) -> &TriggerPhrase {
        &self.trigger
    }

    pub fn is_trigger(&self, utterance: &str) -> bool {
        self.trigger.matches(utterance)
    }

    /// Plan one turn.
    ///
    /// The trigger wins over everything and restarts the form from the first
    /// field. While collecting, the utterance is stored verbatim as the answer
    /// to the current field. Answering the last field yields `Finalize` and
    /// drops back to `Idle` in the same step.
    pub fn advance(&self, state: &SessionState, utterance: &str) -> Transition {
        if self.is_trigger(utterance) {
            return Transition {
                next: SessionState::started(),
                directive: Directive::AskField {
                    field: self.schedule.field_at(0).to_string(),
                    index: 0,
                    context_so_far: CollectedFields::new(),
                },
            };
        }

        let (cursor, collected) = match state {
            SessionState::Idle => return self.passthrough(SessionState::Idle, utterance),
            // A cursor past the end has nothing left to answer.
            SessionState::Collecting { cursor, .. } if *cursor >= self.schedule.len() => {
                return self.passthrough(SessionState::Idle, utterance);
            }
            SessionState::Collecting { cursor, collected } => (*cursor, collected),
        };

        let mut collected = collected.clone();
        collected.insert(self.schedule.field_at(cursor), utterance);
        let cursor = cursor + 1;

        match self.schedule.get(cursor) {
            Some(field) => Transition {
                directive: Directive::AskField {
                    field: field.to_string(),
                    index: cursor,
                    context_so_far: collected.clone(),
                },
                next: SessionState::Collecting { cursor, collected },
            },
            None => Transition {
                next: SessionState::Idle,
                directive: Directive::Finalize { collected },
            },
        }
    }

    fn passthrough(&self, next: SessionState, utterance: &str) -> Transition {
        Transition {
            next,
            directive: Directive::Passthrough {
                utterance: utterance.to_string(),
            },
        }
    }
}

impl Default for FormSessionManager {
    fn default() -> Self {
        Self::new(FieldSchedule::fir(), TriggerPhrase::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> FormSessionManager {
        FormSessionManager::new(
            FieldSchedule::new(["A", "B", "C"]).unwrap(),
            TriggerPhrase::default(),
        )
    }

    fn ask(field: &str, index: usize, pairs: &[(&str, &str)]) -> Directive {
        let mut context_so_far = CollectedFields::new();
        for (label, value) in pairs {
            context_so_far.insert(*label, *value);
        }
        Directive::AskField {
            field: field.into(),
            index,
            context_so_far,
        }
    }

    #[test]
    fn trigger_normalisation() {
        let trigger = TriggerPhrase::default();
        assert!(trigger.matches("fill fir form"));
        assert!(trigger.matches("Fill FIR Form "));
        assert!(trigger.matches(" FILL fir form"));
        assert!(trigger.matches("\tfill fir form\n"));
        assert!(!trigger.matches("fill  fir form"));
        assert!(!trigger.matches("please fill fir form"));
        assert!(!trigger.matches(""));
    }

    #[test]
    fn blank_trigger_rejected() {
        assert!(matches!(
            TriggerPhrase::new("   "),
            Err(IntakeError::BlankTrigger)
        ));
        assert_eq!(TriggerPhrase::new(" Start Form ").unwrap().as_str(), "start form");
    }

    #[test]
    fn idle_non_trigger_passes_through() {
        let manager = abc();
        let t = manager.advance(&SessionState::Idle, "What is bail?");
        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(
            t.directive,
            Directive::Passthrough {
                utterance: "What is bail?".into()
            }
        );
    }

    #[test]
    fn a_b_c_scenario() {
        let manager = abc();

        let t1 = manager.advance(&SessionState::Idle, "fill fir form");
        assert_eq!(t1.directive, ask("A", 0, &[]));
        assert_eq!(t1.next, SessionState::started());

        let t2 = manager.advance(&t1.next, "x");
        assert_eq!(t2.directive, ask("B", 1, &[("A", "x")]));
        assert_eq!(t2.next.cursor(), 1);

        let t3 = manager.advance(&t2.next, "y");
        assert_eq!(t3.directive, ask("C", 2, &[("A", "x"), ("B", "y")]));
        assert_eq!(t3.next.cursor(), 2);

        let t4 = manager.advance(&t3.next, "z");
        match &t4.directive {
            Directive::Finalize { collected } => {
                let entries: Vec<_> = collected
                    .iter()
                    .map(|e| (e.label.as_str(), e.value.as_str()))
                    .collect();
                assert_eq!(entries, vec![("A", "x"), ("B", "y"), ("C", "z")]);
            }
            other => panic!("expected Finalize, got {other:?}"),
        }
        assert_eq!(t4.next, SessionState::Idle);

        let t5 = manager.advance(&t4.next, "hello");
        assert_eq!(
            t5.directive,
            Directive::Passthrough {
                utterance: "hello".into()
            }
        );
    }

    #[test]
    fn full_fir_schedule_collects_every_field_in_order() {
        let manager = FormSessionManager::default();
        let mut state = manager.advance(&SessionState::Idle, "Fill FIR Form").next;
        let answers: Vec<String> = (0..manager.schedule().len())
            .map(|i| format!("answer {i}"))
            .collect();

        let mut last = None;
        for answer in &answers {
            let t = manager.advance(&state, answer);
            state = t.next;
            last = Some(t.directive);
        }

        match last {
            Some(Directive::Finalize { collected }) => {
                assert_eq!(collected.len(), manager.schedule().len());
                for (entry, (field, answer)) in collected
                    .iter()
                    .zip(manager.schedule().iter().zip(&answers))
                {
                    assert_eq!(entry.label, field);
                    assert_eq!(&entry.value, answer);
                }
            }
            other => panic!("expected Finalize, got {other:?}"),
        }
        assert!(!state.is_active());
    }

    #[test]
    fn trigger_mid_form_restarts() {
        let manager = abc();
        let mut collected = CollectedFields::new();
        collected.insert("A", "x");
        collected.insert("B", "y");
        let state = SessionState::Collecting {
            cursor: 2,
            collected,
        };

        let t = manager.advance(&state, " FILL fir form");
        assert_eq!(t.next, SessionState::started());
        assert_eq!(t.directive, ask("A", 0, &[]));
    }

    #[test]
    fn answers_are_stored_verbatim() {
        let manager = abc();
        let t = manager.advance(&SessionState::started(), "  Ravi  Kumar \n");
        assert_eq!(
            t.next.collected().and_then(|c| c.get("A")),
            Some("  Ravi  Kumar \n")
        );
    }

    #[test]
    fn single_field_schedule_finalizes_after_one_answer() {
        let manager =
            FormSessionManager::new(FieldSchedule::new(["Only"]).unwrap(), TriggerPhrase::default());
        let t = manager.advance(&SessionState::started(), "value");
        assert_eq!(t.next, SessionState::Idle);
        assert!(matches!(t.directive, Directive::Finalize { ref collected } if collected.len() == 1));
    }

    #[test]
    fn cursor_past_end_collapses_to_idle_passthrough() {
        let manager = abc();
        let state = SessionState::Collecting {
            cursor: 3,
            collected: CollectedFields::new(),
        };
        let t = manager.advance(&state, "stray");
        assert_eq!(t.next, SessionState::Idle);
        assert_eq!(
            t.directive,
            Directive::Passthrough {
                utterance: "stray".into()
            }
        );
    }

    #[test]
    fn from_config_uses_configured_fields_and_trigger() {
        let config = nyay_config::IntakeConfig {
            trigger_phrase: "Start Complaint".into(),
            fields: vec!["Name".into()],
            ..Default::default()
        };
        let manager = FormSessionManager::from_config(&config).unwrap();
        assert!(manager.is_trigger("start complaint"));
        assert!(!manager.is_trigger("fill fir form"));
        assert_eq!(manager.schedule().len(), 1);
    }
}
