//! Action capabilities available to autonomous initiatives.
//!
//! Calendar, search, code execution and friends live outside the core. The
//! initiative loop only passes the set through to the generator's tool-use
//! step, which dispatches calls by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// JSON tool definition sent to the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ActionInputSchema,
}

/// JSON Schema for action parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

impl ActionInputSchema {
    pub fn object(properties: Value, required: &[&str]) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(data: Value, message: impl Into<String>) -> Self {
        Self { success: true, data, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, data: Value::Null, message: message.into() }
    }

    /// Text handed back to the model as the tool result.
    pub fn to_tool_content(&self) -> String {
        if self.data.is_null() {
            self.message.clone()
        } else {
            format!("{}\n{}", self.message, self.data)
        }
    }
}

#[async_trait::async_trait]
pub trait Action: Send + Sync {
    /// Unique name used for dispatch; matches `spec().name`.
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn spec(&self) -> ActionSpec;
    async fn execute(&self, params: &Value) -> ActionOutcome;
}

// ============================================================================
// ActionSet
// ============================================================================

/// Named registry of actions. Cheap to clone.
#[derive(Clone, Default)]
pub struct ActionSet {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Overwrites any existing action with the same name.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        tracing::debug!("Registered action: {}", name);
        self.actions.insert(name, action);
    }

    pub fn specs(&self) -> Vec<ActionSpec> {
        self.actions.values().map(|a| a.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub async fn execute(&self, name: &str, params: &Value) -> ActionOutcome {
        match self.actions.get(name) {
            Some(action) => {
                let outcome = action.execute(params).await;
                if !outcome.success {
                    tracing::warn!("Action '{}' failed: {}", name, outcome.message);
                }
                outcome
            }
            None => ActionOutcome::failed(format!("Unknown action: {}", name)),
        }
    }
}

impl std::fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.actions.keys()).finish()
    }
}
