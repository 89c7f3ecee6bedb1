use crate::api_types::{ContentBlock, Message, MessagesResponse, Role, Tool};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anima_core::config::LlmConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

/// Client for any OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn new(model: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
            api_key,
            base_url,
            model: model.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            &config.model,
            config.base_url.as_deref(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

/// Convert messages to the chat-completions shape. The system prompt goes
/// first as a `system` message; tool results become `tool` messages.
fn to_openai_messages(system: &str, messages: Vec<Message>) -> Vec<Value> {
    let mut out = vec![json!({ "role": "system", "content": system })];

    for msg in messages {
        match msg.role {
            Role::User => {
                let mut text_parts = Vec::new();
                for block in msg.content {
                    match block {
                        ContentBlock::Text { text } => text_parts.push(text),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            ..
                        } => out.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content
                        })),
                        ContentBlock::ToolUse { .. } => {}
                    }
                }
                if !text_parts.is_empty() {
                    out.push(json!({ "role": "user", "content": text_parts.join("\n") }));
                }
            }
            Role::Assistant => {
                let mut text_parts = Vec::new();
                let mut tool_calls = Vec::new();
                for block in msg.content {
                    match block {
                        ContentBlock::Text { text } => text_parts.push(text),
                        ContentBlock::ToolUse { id, name, input } => tool_calls.push(json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                // OpenAI expects stringified JSON
                                "arguments": input.to_string()
                            }
                        })),
                        ContentBlock::ToolResult { .. } => {}
                    }
                }

                let mut msg_obj = json!({ "role": "assistant" });
                msg_obj["content"] = if text_parts.is_empty() {
                    Value::Null
                } else {
                    json!(text_parts.join("\n"))
                };
                if !tool_calls.is_empty() {
                    msg_obj["tool_calls"] = json!(tool_calls);
                }
                out.push(msg_obj);
            }
        }
    }
    out
}

/// Parse the first choice of a chat-completions response.
fn from_openai_response(resp_json: &Value) -> Result<MessagesResponse> {
    let choice = resp_json["choices"]
        .get(0)
        .context("OpenAI response has no choices")?;
    let message = &choice["message"];
    let finish_reason = choice["finish_reason"].as_str().map(|s| s.to_string());

    let mut content = Vec::new();
    if let Some(text) = message["content"].as_str() {
        if !text.is_empty() {
            content.push(ContentBlock::Text {
                text: text.to_string(),
            });
        }
    }

    if let Some(tool_calls) = message["tool_calls"].as_array() {
        for call in tool_calls {
            let id = call["id"].as_str().unwrap_or_default().to_string();
            let func = &call["function"];
            let name = func["name"].as_str().unwrap_or_default().to_string();
            let args_str = func["arguments"].as_str().unwrap_or("{}");
            let input: Value = serde_json::from_str(args_str).unwrap_or_else(|_| json!({}));
            content.push(ContentBlock::ToolUse { id, name, input });
        }
    }

    Ok(MessagesResponse {
        content,
        stop_reason: finish_reason,
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        tools: Vec<Tool>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let openai_tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema
                    }
                })
            })
            .collect();

        let mut payload = json!({
            "model": self.model,
            "messages": to_openai_messages(system, messages),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });
        if !openai_tools.is_empty() {
            payload["tools"] = json!(openai_tools);
        }

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("OpenAI request to {} (model {})", url, self.model);

        let response = with_retry(&self.retry, "OpenAI", || async {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&payload)
                .send()
                .await
                .context("Failed to send request to OpenAI")
        })
        .await?;

        let resp_json: Value = response
            .json()
            .await
            .context("Failed to decode OpenAI response")?;
        from_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_round_trip_messages() {
        let messages = vec![
            Message::user_text("book a walk"),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "call_1".into(),
                    name: "calendar".into(),
                    input: json!({"when": "tomorrow"}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "call_1".into(),
                    content: "booked".into(),
                    is_error: None,
                }],
            },
        ];
        let out = to_openai_messages("sys", messages);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["role"], "system");
        assert_eq!(out[1]["content"], "book a walk");
        assert_eq!(out[2]["tool_calls"][0]["function"]["name"], "calendar");
        assert!(out[2]["content"].is_null());
        assert_eq!(out[3]["role"], "tool");
        assert_eq!(out[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let body = json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "search", "arguments": "{\"q\":\"tides\"}"}
                    }]
                }
            }]
        });
        let resp = from_openai_response(&body).unwrap();
        let uses = resp.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].1, "search");
        assert_eq!(uses[0].2["q"], "tides");
        assert_eq!(resp.stop_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_parse_response_without_choices_is_error() {
        assert!(from_openai_response(&json!({"error": "x"})).is_err());
    }
}
