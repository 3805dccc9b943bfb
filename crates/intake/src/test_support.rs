//! Scripted provider shared by the unit tests in this crate.

use async_trait::async_trait;
use nyay_core::error::ProviderError;
use nyay_core::message::Message;
use nyay_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies from a queue, one per request, and records every request.
///
/// `None` entries fail that call with a network error. An exhausted queue
/// echoes the prompt back.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    always_fail: bool,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(replies.into_iter().map(|r| Some(r.into())))
    }

    pub fn with_script(script: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            replies: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            always_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            always_fail: true,
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.messages[0].content.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.messages[0].content.clone();
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        if self.always_fail {
            return Err(ProviderError::Network("scripted failure".into()));
        }
        let reply = match self.replies.lock().unwrap().pop_front() {
            Some(Some(text)) => text,
            Some(None) => return Err(ProviderError::Network("scripted failure".into())),
            None => prompt,
        };

        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: None,
            model,
        })
    }
}
