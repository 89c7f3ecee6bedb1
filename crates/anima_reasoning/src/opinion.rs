//! Opinion dynamics.
//!
//! A memory is turned into an opinion draft by the generator. Stored
//! opinions on the same subject are revised numerically against the draft;
//! if none exists the draft becomes a new opinion. Revision weighs the draft
//! against the personality: agreement with the dominant value dimension
//! reinforces, disagreement erodes confidence and stability, and an opinion
//! whose stability collapses is deleted.

use crate::retry::retry_draft;
use anima_core::config::OpinionConfig;
use anima_core::math::{clamp_finite, sign};
use anima_core::{
    Generator, MemoryRecord, MemoryStore, OpinionDraft, OpinionRecord, RecordLocks, SharedTraits,
    TraitProfile,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Dynamics
// ============================================================================

/// Revision constants. Tuned against the raw 0-100 importance scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpinionDynamics {
    /// ρ: weight of network consistency in the expected polarity.
    pub network_weight: f32,
    /// R
    pub reinforce_rate: f32,
    /// C
    pub contradict_rate: f32,
    /// G
    pub stability_gain: f32,
    /// S
    pub stability_loss: f32,
}

impl Default for OpinionDynamics {
    fn default() -> Self {
        Self::from(&OpinionConfig::default())
    }
}

impl From<&OpinionConfig> for OpinionDynamics {
    fn from(config: &OpinionConfig) -> Self {
        Self {
            network_weight: config.network_weight,
            reinforce_rate: config.reinforce_rate,
            contradict_rate: config.contradict_rate,
            stability_gain: config.stability_gain,
            stability_loss: config.stability_loss,
        }
    }
}

/// Outcome of revising one stored opinion.
#[derive(Debug, Clone, PartialEq)]
pub enum Revision {
    Kept(OpinionRecord),
    /// Stability collapsed to zero; the opinion must be removed.
    Deleted,
}

impl OpinionDynamics {
    /// Stability of a freshly formed opinion.
    pub fn initial_stability(traits: &TraitProfile, draft: &OpinionDraft) -> f32 {
        match draft.dimension() {
            Some(dim) => clamp_finite(0.5 + traits.dimension_average(dim) / 200.0, 0.0, 1.0),
            None => 0.5,
        }
    }

    /// Revise `existing` against a new observation with polarity
    /// `draft_polarity`. Pure; the caller persists the result.
    pub fn revise(
        &self,
        existing: &OpinionRecord,
        draft_polarity: f32,
        traits: &TraitProfile,
        now: DateTime<Utc>,
    ) -> Revision {
        let mut o = existing.clone();
        o.clamp();
        let draft_polarity = clamp_finite(draft_polarity, -1.0, 1.0);

        let imp = traits.importance(o.main_dimension);
        let normalized_dominant = (traits.max_dimension_average() - 50.0) / 50.0;
        let network = normalized_dominant * draft_polarity;

        let rho = self.network_weight;
        let expected = clamp_finite((1.0 - rho) * o.polarity + rho * network, -1.0, 1.0);

        let s_old = sign(o.polarity);
        let s_exp = sign(expected);

        let d_confidence = if s_old == 0 {
            self.reinforce_rate
                * imp
                * (1.0 - o.confidence)
                * (0.75 + 0.5 * (network + 1.0) / 2.0)
        } else if s_old == s_exp {
            self.reinforce_rate * imp * (1.0 - o.confidence) * (1.0 + 0.5 * network.max(0.0))
        } else {
            -self.contradict_rate * imp * o.confidence * (1.0 + 0.5 * (-network).max(0.0))
        };

        let sign_delta = if s_old == 0 {
            0.5
        } else if s_old == s_exp {
            1.0
        } else {
            -1.0
        };
        let net_stab_factor = 1.0 + 0.3 * (network + 1.0) / 2.0;
        let rate = if sign_delta > 0.0 {
            self.stability_gain
        } else {
            -self.stability_loss
        };

        let stability = clamp_finite(
            o.stability + rate * imp * d_confidence.abs() * net_stab_factor,
            0.0,
            1.0,
        );
        if stability <= 0.0 {
            return Revision::Deleted;
        }

        let coherence = match o.main_dimension {
            Some(dim) => (traits.dimension_average(dim) - traits.overall_average()) / 100.0,
            None => 0.0,
        };

        o.stability = stability;
        o.confidence = clamp_finite(o.confidence + d_confidence, 0.0, 1.0);
        o.polarity = clamp_finite(
            o.polarity * stability + (1.0 - stability) * (0.70 * expected + 0.30 * coherence),
            -1.0,
            1.0,
        );
        o.updated_at = now;
        Revision::Kept(o)
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct OpinionEngine {
    generator: Arc<dyn Generator>,
    store: Arc<dyn MemoryStore>,
    traits: SharedTraits,
    config: OpinionConfig,
    dynamics: OpinionDynamics,
    locks: RecordLocks,
}

impl OpinionEngine {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn MemoryStore>,
        traits: SharedTraits,
        config: OpinionConfig,
    ) -> Self {
        let dynamics = OpinionDynamics::from(&config);
        Self {
            generator,
            store,
            traits,
            config,
            dynamics,
            locks: RecordLocks::new(),
        }
    }

    /// Locks shared with other components that mutate opinions.
    pub fn with_locks(mut self, locks: RecordLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn dynamics(&self) -> OpinionDynamics {
        self.dynamics
    }

    /// Form or revise opinions from one memory.
    ///
    /// Returns `None` when no draft could be obtained or the store could not
    /// be searched; nothing is written in that case. Otherwise returns every
    /// opinion that resulted, revised or newly created. Matches that were
    /// deleted, vanished concurrently or failed to persist are left out.
    pub async fn process_interaction(&self, memory: &MemoryRecord) -> Option<Vec<OpinionRecord>> {
        let generator = &self.generator;
        let draft = retry_draft(
            "opinion draft",
            self.config.draft_attempts,
            self.config.draft_timeout(),
            || async move {
                let draft = generator.draft_opinion(memory).await?;
                Ok::<_, anyhow::Error>(draft.validate()?)
            },
        )
        .await?;
        let draft = sanitize(draft);

        let hits = match self
            .store
            .search_opinions(&draft.subject, self.config.search_top_k)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Opinion search for '{}' failed: {:#}", draft.subject, e);
                return None;
            }
        };

        let matches: Vec<Uuid> = hits
            .into_iter()
            .filter(|hit| hit.similarity >= self.config.similarity_threshold)
            .map(|hit| hit.record.id)
            .collect();

        if matches.is_empty() {
            return self.create(memory, draft).await.map(|o| vec![o]);
        }

        let mut results = Vec::with_capacity(matches.len());
        for id in matches {
            if let Some(revised) = self.revise_one(id, memory, &draft).await {
                results.push(revised);
            }
        }
        Some(results)
    }

    async fn create(&self, memory: &MemoryRecord, draft: OpinionDraft) -> Option<OpinionRecord> {
        let traits = self.traits.snapshot();
        let now = Utc::now();
        let mut opinion = OpinionRecord {
            id: Uuid::new_v4(),
            stability: OpinionDynamics::initial_stability(&traits, &draft),
            main_dimension: draft.dimension(),
            subject: draft.subject,
            summary: draft.summary,
            narrative: draft.narrative,
            polarity: draft.polarity,
            confidence: draft.confidence,
            associated_memories: BTreeSet::from([memory.id]),
            associated_desire: None,
            embedding: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        opinion.clamp();

        match self.store.upsert_opinion(&opinion).await {
            Ok(()) => {
                tracing::info!(
                    "Formed opinion {} on '{}' (polarity {:.2}, stability {:.2})",
                    opinion.id,
                    opinion.subject,
                    opinion.polarity,
                    opinion.stability
                );
                Some(opinion)
            }
            Err(e) => {
                tracing::error!("Failed to persist new opinion on '{}': {:#}", opinion.subject, e);
                None
            }
        }
    }

    /// Revise one matched opinion under its record lock.
    async fn revise_one(
        &self,
        id: Uuid,
        memory: &MemoryRecord,
        draft: &OpinionDraft,
    ) -> Option<OpinionRecord> {
        let _guard = self.locks.lock(id).await;

        // Re-read under the lock; the search hit may be stale.
        let existing = match self.store.get_opinion(id).await {
            Ok(Some(o)) => o,
            Ok(None) => {
                tracing::debug!("Opinion {} vanished before revision", id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to load opinion {}: {:#}", id, e);
                return None;
            }
        };

        let traits = self.traits.snapshot();
        match self
            .dynamics
            .revise(&existing, draft.polarity, &traits, Utc::now())
        {
            Revision::Deleted => {
                tracing::info!(
                    "Opinion {} on '{}' lost all stability; deleting",
                    id,
                    existing.subject
                );
                if let Err(e) = self.store.delete_opinion(id).await {
                    tracing::error!("Failed to delete opinion {}: {:#}", id, e);
                }
                None
            }
            Revision::Kept(mut revised) => {
                revised.associated_memories.insert(memory.id);
                if let Err(e) = self.store.upsert_opinion(&revised).await {
                    tracing::error!("Failed to persist revised opinion {}: {:#}", id, e);
                    return None;
                }
                tracing::debug!(
                    "Revised opinion {}: polarity {:.2} -> {:.2}, confidence {:.2} -> {:.2}, stability {:.2} -> {:.2}",
                    id,
                    existing.polarity,
                    revised.polarity,
                    existing.confidence,
                    revised.confidence,
                    existing.stability,
                    revised.stability
                );
                Some(revised)
            }
        }
    }
}

/// Non-finite or out-of-range draft numbers are clamped, never propagated.
fn sanitize(mut draft: OpinionDraft) -> OpinionDraft {
    draft.subject = draft.subject.trim().to_string();
    draft.polarity = clamp_finite(draft.polarity, -1.0, 1.0);
    draft.confidence = clamp_finite(draft.confidence, 0.0, 1.0);
    draft
}
