//! The structured form summary carried inside a finalize reply.

use crate::translate::split_fenced;
use nyay_core::session::{CollectedFields, FieldEntry};
use serde::{Deserialize, Serialize};

/// `{"fir_data": [{"label": ..., "value": ...}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirSummary {
    pub fir_data: Vec<FieldEntry>,
}

impl FirSummary {
    pub fn from_collected(collected: &CollectedFields) -> Self {
        Self {
            fir_data: collected.iter().cloned().collect(),
        }
    }

    /// Parse the fenced payload out of a generated reply.
    pub fn extract(text: &str) -> Option<Self> {
        let fenced = split_fenced(text)?;
        serde_json::from_str(fenced.payload).ok()
    }

    /// The summary as a ```` ```json ```` block.
    pub fn to_fenced(&self) -> String {
        let json = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into());
        format!("```json\n{json}\n```")
    }
}

/// Make sure a finalize reply carries a parsable payload. Replies that
/// already do are returned unchanged; otherwise a payload built from
/// `collected` is appended.
pub fn ensure_payload(reply: String, collected: &CollectedFields) -> String {
    if FirSummary::extract(&reply).is_some() {
        return reply;
    }
    tracing::warn!("Finalize reply had no usable JSON payload, appending one");
    let fenced = FirSummary::from_collected(collected).to_fenced();
    if reply.trim().is_empty() {
        fenced
    } else {
        format!("{}\n{fenced}", reply.trim_end())
    }
}
