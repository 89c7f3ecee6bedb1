//! LLM providers.

pub mod mock;
pub mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiClient;

use crate::llm::LlmClient;
use anima_core::config::LlmConfig;
use anyhow::Result;
use std::sync::Arc;

/// Build the client named by `config.provider`.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::from_config(config)?)),
        "mock" => Ok(Arc::new(MockProvider::new(&config.model))),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}
