use anima_core::{Action, ActionInputSchema, ActionOutcome, ActionSpec, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 20;

/// Lets an initiative look through what Anima remembers and believes.
pub struct RecallAction {
    store: Arc<dyn MemoryStore>,
}

impl RecallAction {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Action for RecallAction {
    fn name(&self) -> &str {
        "recall"
    }

    fn description(&self) -> &str {
        "Search your own memories or opinions"
    }

    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: "recall".to_string(),
            description: "Search your own memories or opinions. Kinds: \"memories\" (things that happened), \"opinions\" (what you think about a subject).".to_string(),
            input_schema: ActionInputSchema::object(
                json!({
                    "kind": {
                        "type": "string",
                        "enum": ["memories", "opinions"],
                        "description": "What to search"
                    },
                    "query": {
                        "type": "string",
                        "description": "What to look for"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum results (optional, default 5)"
                    }
                }),
                &["kind", "query"],
            ),
        }
    }

    async fn execute(&self, params: &Value) -> ActionOutcome {
        let kind = match params.get("kind").and_then(|v| v.as_str()) {
            Some(k) => k,
            None => return ActionOutcome::failed("Missing required parameter: \"kind\""),
        };
        let query = match params.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => return ActionOutcome::failed("Missing required parameter: \"query\""),
        };
        let limit = params
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).min(MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);

        match kind {
            "memories" => match self.store.search_memories(query, limit).await {
                Ok(hits) => {
                    let items: Vec<Value> = hits
                        .iter()
                        .map(|h| {
                            json!({
                                "content": h.record.content,
                                "subject": h.record.subject.as_str(),
                                "similarity": h.similarity,
                            })
                        })
                        .collect();
                    ActionOutcome::ok(json!(items), format!("Found {} memories", items.len()))
                }
                Err(e) => ActionOutcome::failed(format!("Memory search failed: {e}")),
            },
            "opinions" => match self.store.search_opinions(query, limit).await {
                Ok(hits) => {
                    let items: Vec<Value> = hits
                        .iter()
                        .map(|h| {
                            json!({
                                "subject": h.record.subject,
                                "summary": h.record.summary,
                                "polarity": h.record.polarity,
                                "confidence": h.record.confidence,
                            })
                        })
                        .collect();
                    ActionOutcome::ok(json!(items), format!("Found {} opinions", items.len()))
                }
                Err(e) => ActionOutcome::failed(format!("Opinion search failed: {e}")),
            },
            _ => ActionOutcome::failed(format!("Unknown kind: {kind}")),
        }
    }
}
