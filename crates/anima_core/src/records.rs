//! Long-lived records: memories, opinions and desires.

use crate::math::clamp_finite;
use crate::personality::Dimension;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

pub type Embedding = Vec<f32>;

// ============================================================================
// MemoryRecord
// ============================================================================

/// Coarse subject of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySubject {
    SelfRef,
    User,
    World,
    Other,
}

impl MemorySubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySubject::SelfRef => "self",
            MemorySubject::User => "user",
            MemorySubject::World => "world",
            MemorySubject::Other => "other",
        }
    }

    pub fn parse_str(s: &str) -> Self {
        match s {
            "self" | "self_ref" => MemorySubject::SelfRef,
            "user" => MemorySubject::User,
            "world" => MemorySubject::World,
            _ => MemorySubject::Other,
        }
    }
}

/// Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub content: String,
    pub subject: MemorySubject,
    /// Satisfaction with the exchange (-1.0 to 1.0)
    pub satisfaction: f32,
    pub timestamp: DateTime<Utc>,
    /// Filled in by the store on write when left empty.
    #[serde(default)]
    pub embedding: Embedding,
}

impl MemoryRecord {
    pub fn new(content: impl Into<String>, subject: MemorySubject, satisfaction: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            subject,
            satisfaction: clamp_finite(satisfaction, -1.0, 1.0),
            timestamp: Utc::now(),
            embedding: Vec::new(),
        }
    }

    /// A memory written by the initiative loop rather than a conversation.
    pub fn auto_generated(content: impl Into<String>) -> Self {
        Self::new(content, MemorySubject::SelfRef, 0.0)
    }
}

// ============================================================================
// OpinionRecord
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionRecord {
    pub id: Uuid,
    /// Free-text subject label, e.g. "self-sacrifice".
    pub subject: String,
    pub summary: String,
    pub narrative: String,
    /// Stance (-1.0 to 1.0)
    pub polarity: f32,
    /// Certainty (0.0 to 1.0)
    pub confidence: f32,
    /// Resistance to change (0.0 to 1.0). Deleted at zero.
    pub stability: f32,
    pub associated_memories: BTreeSet<Uuid>,
    pub associated_desire: Option<Uuid>,
    pub main_dimension: Option<Dimension>,
    #[serde(default)]
    pub embedding: Embedding,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OpinionRecord {
    /// Re-establish the range invariants after a mutation.
    pub fn clamp(&mut self) {
        self.polarity = clamp_finite(self.polarity, -1.0, 1.0);
        self.confidence = clamp_finite(self.confidence, 0.0, 1.0);
        self.stability = clamp_finite(self.stability, 0.0, 1.0);
    }

    /// Text the store embeds for similarity search. Opinions are matched
    /// by subject, so the subject alone is embedded.
    pub fn embedding_text(&self) -> &str {
        &self.subject
    }
}

// ============================================================================
// DesireRecord
// ============================================================================

/// Lifecycle of a desire.
///
/// `Pending → Active → Satisfied | Abandoned`. The transitions are enforced
/// by the desire engine and the initiative loop, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesireStatus {
    Pending,
    Active,
    Satisfied,
    Abandoned,
}

impl DesireStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesireStatus::Pending => "PENDING",
            DesireStatus::Active => "ACTIVE",
            DesireStatus::Satisfied => "SATISFIED",
            DesireStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse_str(s: &str) -> Self {
        match s {
            "ACTIVE" => DesireStatus::Active,
            "SATISFIED" => DesireStatus::Satisfied,
            "ABANDONED" => DesireStatus::Abandoned,
            _ => DesireStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DesireStatus::Satisfied | DesireStatus::Abandoned)
    }
}

impl fmt::Display for DesireStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesireRecord {
    pub id: Uuid,
    pub opinion_id: Uuid,
    pub label: String,
    pub description: String,
    /// Drive strength (0.0 to 1.0)
    pub intensity: f32,
    pub reasoning: String,
    pub status: DesireStatus,
    #[serde(default)]
    pub embedding: Embedding,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DesireRecord {
    pub fn embedding_text(&self) -> &str {
        &self.label
    }
}
