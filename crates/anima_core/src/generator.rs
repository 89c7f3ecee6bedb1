//! Language-model collaborator contract and the drafts it produces.
//!
//! A draft is only a proposal: the engines validate it, clamp every number
//! and integrate it into long-lived state themselves. An error, a timeout or
//! a draft failing validation all mean the same thing, "no result".

use crate::action::ActionSet;
use crate::error::CoreError;
use crate::math::deserialize_safe_f32;
use crate::pad::PadState;
use crate::personality::Dimension;
use crate::records::{MemoryRecord, OpinionRecord};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Drafts
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpinionDraft {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub narrative: String,
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub polarity: f32,
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub confidence: f32,
    /// Free text; resolved with [`Dimension::parse_str`].
    #[serde(default)]
    pub main_dimension: Option<String>,
}

impl OpinionDraft {
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.subject.trim().is_empty() {
            return Err(CoreError::InvalidDraft("opinion draft has an empty subject".into()));
        }
        Ok(self)
    }

    pub fn dimension(&self) -> Option<Dimension> {
        self.main_dimension.as_deref().and_then(Dimension::parse_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesireDraft {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reasoning: String,
}

impl DesireDraft {
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.label.trim().is_empty() {
            return Err(CoreError::InvalidDraft("desire draft has an empty label".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodDelta {
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub pleasure: f32,
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
}

impl MoodDelta {
    pub fn validate(self) -> Result<Self, CoreError> {
        if !(self.pleasure.is_finite() && self.arousal.is_finite() && self.dominance.is_finite()) {
            return Err(CoreError::InvalidDraft("mood delta has non-finite components".into()));
        }
        Ok(self)
    }
}

// ============================================================================
// Generator
// ============================================================================

#[async_trait]
pub trait Generator: Send + Sync {
    /// Propose an opinion seeded by a memory.
    async fn draft_opinion(&self, memory: &MemoryRecord) -> Result<OpinionDraft>;

    /// Propose a desire for an opinion deemed important enough.
    async fn draft_desire(&self, opinion: &OpinionRecord, importance: f32) -> Result<DesireDraft>;

    /// Propose how a finished turn moved the affect state.
    async fn draft_mood_delta(&self, pad: &PadState, query: &str, answer: &str)
        -> Result<MoodDelta>;

    /// Tool-enabled chat run for an autonomous initiative. Returns the final text.
    async fn run_initiative(&self, prompt: &str, actions: &ActionSet) -> Result<String>;
}
