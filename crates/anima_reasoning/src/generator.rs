//! Language-model implementation of the [`Generator`] contract.

use crate::api_types::{ContentBlock, Message, Role, Tool};
use crate::extraction::parse_json_lenient;
use crate::llm::{CompletionParams, LlmClient};
use crate::prompts;
use anima_core::{
    ActionSet, CoreError, DesireDraft, Generator, MemoryRecord, MoodDelta, OpinionDraft,
    OpinionRecord, PadState,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub struct LlmGenerator {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    max_tool_rounds: usize,
}

impl LlmGenerator {
    pub fn new(client: Arc<dyn LlmClient>, params: CompletionParams, max_tool_rounds: usize) -> Self {
        Self {
            client,
            params,
            max_tool_rounds,
        }
    }

    /// One tool-less completion, answered as text.
    async fn ask(&self, system: &str, request: String) -> Result<String> {
        let response = self
            .client
            .complete(
                system,
                vec![Message::user_text(request)],
                vec![],
                self.params.for_drafts(),
            )
            .await
            .map_err(|e| CoreError::Generation(format!("{:#}", e)))?;
        Ok(response.joined_text())
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn draft_opinion(&self, memory: &MemoryRecord) -> Result<OpinionDraft> {
        let text = self
            .ask(prompts::OPINION_SYSTEM_PROMPT, prompts::opinion_request(memory))
            .await?;
        parse_json_lenient(&text).context("Unparseable opinion draft")
    }

    async fn draft_desire(&self, opinion: &OpinionRecord, importance: f32) -> Result<DesireDraft> {
        let text = self
            .ask(
                prompts::DESIRE_SYSTEM_PROMPT,
                prompts::desire_request(opinion, importance),
            )
            .await?;
        parse_json_lenient(&text).context("Unparseable desire draft")
    }

    async fn draft_mood_delta(&self, pad: &PadState, query: &str, answer: &str) -> Result<MoodDelta> {
        let text = self
            .ask(
                prompts::MOOD_SYSTEM_PROMPT,
                prompts::mood_request(pad, query, answer),
            )
            .await?;
        parse_json_lenient(&text).context("Unparseable mood delta")
    }

    /// Tool-use loop: every round either ends with plain text or with tool
    /// calls, whose results are fed back for the next round. Bounded by
    /// `max_tool_rounds` follow-ups.
    async fn run_initiative(&self, prompt: &str, actions: &ActionSet) -> Result<String> {
        let tools: Vec<Tool> = actions.specs().into_iter().map(Tool::from).collect();
        let mut messages = vec![Message::user_text(prompt)];
        let mut transcript = Vec::new();

        for round in 0..=self.max_tool_rounds {
            let response = self
                .client
                .complete(
                    prompts::INITIATIVE_SYSTEM_PROMPT,
                    messages.clone(),
                    tools.clone(),
                    self.params.clone(),
                )
                .await
                .map_err(|e| CoreError::Generation(format!("{:#}", e)))?;

            let text = response.joined_text();
            if !text.trim().is_empty() {
                transcript.push(text);
            }

            let calls: Vec<(String, String, serde_json::Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            if calls.is_empty() {
                break;
            }
            if round == self.max_tool_rounds {
                tracing::warn!(
                    "Initiative hit the tool round limit ({}); ignoring {} pending call(s)",
                    self.max_tool_rounds,
                    calls.len()
                );
                break;
            }

            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in &calls {
                tracing::info!("Initiative calls action '{}'", name);
                let outcome = actions.execute(name, input).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: outcome.to_tool_content(),
                    is_error: (!outcome.success).then_some(true),
                });
            }

            messages.push(Message {
                role: Role::Assistant,
                content: response.content,
            });
            messages.push(Message {
                role: Role::User,
                content: results,
            });
        }

        if transcript.is_empty() {
            return Err(CoreError::Generation("initiative produced no text".into()).into());
        }
        Ok(transcript.join("\n"))
    }
}
