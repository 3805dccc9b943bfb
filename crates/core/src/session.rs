//! Session state — per-conversation progress through the intake form.
//!
//! A conversation is either idle (free-form legal guidance) or collecting
//! answers for the form. The state is a single tagged variant so that the
//! "active" flag, the cursor and the collected answers can never disagree.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key identifying one ongoing conversation.
///
/// Supplied by the caller (a session token), never derived from the network
/// address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Mint a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One collected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    /// The field identifier (as declared in the schedule)
    pub label: String,

    /// The user's answer, verbatim
    pub value: String,
}

/// Answers collected so far, kept in the order they were recorded.
///
/// Since fields are recorded in schedule order, iteration order is schedule
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedFields(Vec<FieldEntry>);

impl CollectedFields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record an answer, replacing any earlier answer for the same field.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.0.iter_mut().find(|e| e.label == label) {
            Some(existing) => existing.value = value,
            None => self.0.push(FieldEntry { label, value }),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldEntry> {
        self.0.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.label.as_str())
    }
}

impl<'a> IntoIterator for &'a CollectedFields {
    type Item = &'a FieldEntry;
    type IntoIter = std::slice::Iter<'a, FieldEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The persisted state of one conversation.
///
/// There is no `Done` variant: finishing the form collapses straight back to
/// `Idle` within the same turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No form in progress.
    #[default]
    Idle,

    /// Filling the form; `cursor` indexes the field awaiting an answer.
    Collecting {
        cursor: usize,
        collected: CollectedFields,
    },
}

impl SessionState {
    /// A freshly started form.
    pub fn started() -> Self {
        Self::Collecting {
            cursor: 0,
            collected: CollectedFields::new(),
        }
    }

    /// Whether a form-filling flow is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Collecting { .. })
    }

    /// Index of the next field to answer (0 when idle).
    pub fn cursor(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Collecting { cursor, .. } => *cursor,
        }
    }

    /// Answers collected so far (`None` when idle).
    pub fn collected(&self) -> Option<&CollectedFields> {
        match self {
            Self::Idle => None,
            Self::Collecting { collected, .. } => Some(collected),
        }
    }
}

/// Keyed storage of per-conversation state.
///
/// The store exclusively owns the key → state mapping. Concurrent calls for
/// different keys must not affect each other; calls for the same key are
/// serialized by the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The store name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return the state for `key`, inserting a default `Idle` entry if absent.
    async fn get_or_create(&self, key: &SessionKey) -> SessionState;

    /// Set the entry for `key` back to `Idle`, creating it if absent.
    async fn reset(&self, key: &SessionKey);

    /// Replace the entry for `key` with `state`.
    async fn put(&self, key: &SessionKey, state: SessionState);

    /// Number of live entries.
    async fn len(&self) -> usize;
}
