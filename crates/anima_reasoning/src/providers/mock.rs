//! Mock LLM Provider: deterministic responses for running without API keys.

use crate::api_types::{Message, MessagesResponse, Tool};
use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replays scripted responses in order, then falls back to a fixed
/// acknowledgement.
#[derive(Debug)]
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<MessagesResponse>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self::scripted(model, Vec::new())
    }

    pub fn scripted(model: &str, responses: Vec<MessagesResponse>) -> Self {
        Self {
            model: model.to_string(),
            script: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, response: MessagesResponse) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: Vec<Message>,
        _tools: Vec<Tool>,
        _params: CompletionParams,
    ) -> Result<MessagesResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| {
            MessagesResponse::text(format!(
                "(Mock {} Response) I received your prompt.",
                self.model
            ))
        }))
    }
}
