use crate::api_types::{Message, MessagesResponse, Tool};
use anima_core::config::LlmConfig;
use anyhow::Result;
use async_trait::async_trait;

/// Parameters for LLM completion
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl CompletionParams {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature.clamp(0.0, 2.0),
        }
    }

    /// Same budget, cooler sampling for structured JSON drafts.
    pub fn for_drafts(&self) -> Self {
        Self {
            max_tokens: self.max_tokens,
            temperature: self.temperature.min(0.3),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request with tool definitions.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        tools: Vec<Tool>,
        params: CompletionParams,
    ) -> Result<MessagesResponse>;
}
