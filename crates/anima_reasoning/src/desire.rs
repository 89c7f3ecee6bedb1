//! Desire formation.
//!
//! An opinion held firmly enough, and on a topic the personality cares
//! about, gives rise to a desire. Later observations of the same opinion
//! feed the desire's intensity through exponential smoothing; once the
//! intensity reaches the initiative threshold the desire is handed to the
//! [`InitiativeLoop`] as ACTIVE.
//!
//! Crossing the threshold persists the desire as ACTIVE before the
//! initiative runs. Only the initiative loop writes the terminal SATISFIED
//! or ABANDONED states, so a failed initiative leaves an ACTIVE desire that
//! a later cycle retries.

use crate::initiative::InitiativeLoop;
use crate::retry::retry_draft;
use anima_core::config::DesireConfig;
use anima_core::math::clamp_finite;
use anima_core::{
    DesireRecord, DesireStatus, Generator, MemoryStore, OpinionRecord, RecordLocks, SharedTraits,
    TraitProfile,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Intensity an opinion would give a desire right now.
///
/// `(0.4·|polarity| + 0.3·confidence + 0.3·stability) · (0.5 + alignment)`,
/// clamped to [0, 1]. Untagged opinions align at the overall trait average.
pub fn desire_signal(opinion: &OpinionRecord, traits: &TraitProfile, config: &DesireConfig) -> f32 {
    let alignment = match opinion.main_dimension {
        Some(dim) => traits.value_alignment(
            dim,
            config.strong_trait_threshold,
            config.conflict_penalty,
        ),
        None => clamp_finite(traits.overall_average() / 100.0, 0.0, 1.0),
    };
    let strength = 0.4 * clamp_finite(opinion.polarity, -1.0, 1.0).abs()
        + 0.3 * clamp_finite(opinion.confidence, 0.0, 1.0)
        + 0.3 * clamp_finite(opinion.stability, 0.0, 1.0);
    clamp_finite(strength * (0.5 + alignment), 0.0, 1.0)
}

pub struct DesireEngine {
    generator: Arc<dyn Generator>,
    store: Arc<dyn MemoryStore>,
    traits: SharedTraits,
    config: DesireConfig,
    locks: RecordLocks,
    initiative: Option<Arc<InitiativeLoop>>,
}

impl DesireEngine {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn MemoryStore>,
        traits: SharedTraits,
        config: DesireConfig,
    ) -> Self {
        Self {
            generator,
            store,
            traits,
            config,
            locks: RecordLocks::new(),
            initiative: None,
        }
    }

    /// Locks shared with the opinion engine and the initiative loop.
    pub fn with_locks(mut self, locks: RecordLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_initiative(mut self, initiative: Arc<InitiativeLoop>) -> Self {
        self.initiative = Some(initiative);
        self
    }

    /// Create or reinforce the desire linked to `opinion`.
    ///
    /// The opinion is re-read from the store; one that is no longer stored
    /// yields `None`. A linked desire that has gone missing is replaced by a
    /// new one. A desire that reaches the initiative threshold is stored and
    /// returned as ACTIVE after the initiative (if one is attached) has run.
    pub async fn process_opinion(&self, opinion: &OpinionRecord) -> Option<DesireRecord> {
        let guard = self.locks.lock(opinion.id).await;

        let current = match self.store.get_opinion(opinion.id).await {
            Ok(Some(o)) => o,
            Ok(None) => {
                tracing::debug!("Opinion {} is no longer stored; no desire", opinion.id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to load opinion {}: {:#}", opinion.id, e);
                return None;
            }
        };

        if let Some(desire_id) = current.associated_desire {
            match self.store.get_desire(desire_id).await {
                Ok(Some(_)) => {
                    drop(guard);
                    return self.reinforce(desire_id, &current).await;
                }
                Ok(None) => {
                    tracing::warn!(
                        "Desire {} linked from opinion {} is missing; forming a new one",
                        desire_id,
                        current.id
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to load desire {}: {:#}", desire_id, e);
                    return None;
                }
            }
        }

        // The opinion lock stays held so two observations cannot both
        // create a desire for it.
        let created = self.create(current).await;
        drop(guard);
        created
    }

    async fn create(&self, mut opinion: OpinionRecord) -> Option<DesireRecord> {
        let traits = self.traits.snapshot();
        let signal = desire_signal(&opinion, &traits, &self.config);
        if signal < self.config.creation_threshold {
            tracing::debug!(
                "Opinion {} on '{}' too weak for a desire ({:.3} < {:.3})",
                opinion.id,
                opinion.subject,
                signal,
                self.config.creation_threshold
            );
            return None;
        }

        let importance = traits.importance(opinion.main_dimension);
        let generator = &self.generator;
        let source = &opinion;
        let draft = retry_draft(
            "desire draft",
            self.config.draft_attempts,
            self.config.draft_timeout(),
            || async move {
                let draft = generator.draft_desire(source, importance).await?;
                Ok::<_, anyhow::Error>(draft.validate()?)
            },
        )
        .await?;

        let now = Utc::now();
        let desire = DesireRecord {
            id: Uuid::new_v4(),
            opinion_id: opinion.id,
            label: draft.label.trim().to_string(),
            description: draft.description,
            intensity: signal,
            reasoning: draft.reasoning,
            status: DesireStatus::Pending,
            embedding: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.store.upsert_desire(&desire).await {
            tracing::error!("Failed to persist desire for opinion {}: {:#}", opinion.id, e);
            return None;
        }

        opinion.associated_desire = Some(desire.id);
        if let Err(e) = self.store.upsert_opinion(&opinion).await {
            tracing::error!(
                "Desire {} created but linking it to opinion {} failed: {:#}",
                desire.id,
                opinion.id,
                e
            );
        }

        tracing::info!(
            "New desire {} '{}' (intensity {:.2}) from opinion '{}'",
            desire.id,
            desire.label,
            desire.intensity,
            opinion.subject
        );
        Some(desire)
    }

    async fn reinforce(&self, desire_id: Uuid, opinion: &OpinionRecord) -> Option<DesireRecord> {
        let guard = self.locks.lock(desire_id).await;

        let mut desire = match self.store.get_desire(desire_id).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                tracing::debug!("Desire {} vanished before reinforcement", desire_id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to load desire {}: {:#}", desire_id, e);
                return None;
            }
        };

        if desire.status.is_terminal() {
            tracing::debug!("Desire {} is {}; left as is", desire.id, desire.status);
            return Some(desire);
        }

        let traits = self.traits.snapshot();
        let signal = desire_signal(opinion, &traits, &self.config);
        let previous = desire.intensity;
        let smoothing = clamp_finite(self.config.smoothing, 0.0, 1.0);
        desire.intensity = clamp_finite(
            smoothing * clamp_finite(previous, 0.0, 1.0) + (1.0 - smoothing) * signal,
            0.0,
            1.0,
        );
        let triggered = desire.intensity >= self.config.initiative_threshold;
        if triggered {
            desire.status = DesireStatus::Active;
        }
        desire.updated_at = Utc::now();

        if let Err(e) = self.store.upsert_desire(&desire).await {
            tracing::error!("Failed to persist desire {}: {:#}", desire.id, e);
            return None;
        }
        drop(guard);

        tracing::debug!(
            "Desire {} intensity {:.3} -> {:.3}",
            desire.id,
            previous,
            desire.intensity
        );

        if !triggered {
            return Some(desire);
        }

        tracing::info!(
            "Desire {} '{}' reached {:.2}; taking initiative",
            desire.id,
            desire.label,
            desire.intensity
        );
        if let Some(initiative) = &self.initiative {
            initiative.process_initiative(&desire).await;
        }
        Some(desire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_core::{Dimension, Trait};
    use std::collections::BTreeSet;

    fn opinion(polarity: f32, confidence: f32, stability: f32, dim: Option<Dimension>) -> OpinionRecord {
        let now = Utc::now();
        OpinionRecord {
            id: Uuid::new_v4(),
            subject: "s".into(),
            summary: String::new(),
            narrative: String::new(),
            polarity,
            confidence,
            stability,
            associated_memories: BTreeSet::new(),
            associated_desire: None,
            main_dimension: dim,
            embedding: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_signal_formula() {
        let traits = TraitProfile::balanced();
        let cfg = DesireConfig::default();
        let o = opinion(-0.5, 0.5, 0.5, Some(Dimension::SelfTranscendence));
        // (0.2 + 0.15 + 0.15) · (0.5 + 0.5) = 0.5
        assert!((desire_signal(&o, &traits, &cfg) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_signal_penalised_by_strong_antagonist() {
        let mut traits = TraitProfile::balanced();
        for t in [Trait::Achievement, Trait::Power] {
            traits.set_score(t, 90.0);
        }
        let cfg = DesireConfig::default();
        let o = opinion(1.0, 1.0, 1.0, Some(Dimension::SelfTranscendence));
        // alignment 0.5 · 0.8 = 0.4 → 1.0 · 0.9
        assert!((desire_signal(&o, &traits, &cfg) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_signal_is_clamped() {
        let mut traits = TraitProfile::balanced();
        for t in Trait::ALL {
            traits.set_score(t, 100.0);
        }
        let cfg = DesireConfig::default();
        let o = opinion(f32::NAN, 5.0, 5.0, None);
        let s = desire_signal(&o, &traits, &cfg);
        assert!((0.0..=1.0).contains(&s));
    }
}
