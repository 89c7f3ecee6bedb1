//! Orchestration of one cognitive cycle.
//!
//! A turn is memorised, the memory drives the opinion engine, every
//! resulting opinion drives the desire engine, and desires that reach the
//! initiative threshold are acted on. The mood update runs off the same turn
//! on its own detached task.

use crate::desire::DesireEngine;
use crate::initiative::InitiativeLoop;
use crate::opinion::OpinionEngine;
use anima_core::{
    ActionSet, AnimaConfig, DesireRecord, DesireStatus, Generator, MemoryRecord, MemoryStore,
    MemorySubject, OpinionRecord, RecordLocks, SharedTraits,
};
use anima_limbic::{MoodEngine, TurnContext};
use std::sync::Arc;

/// What one observed memory led to.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub opinions: Vec<OpinionRecord>,
    pub desires: Vec<DesireRecord>,
}

pub struct CognitiveCycle {
    store: Arc<dyn MemoryStore>,
    traits: SharedTraits,
    opinions: Arc<OpinionEngine>,
    desires: DesireEngine,
    initiative: Arc<InitiativeLoop>,
    mood: MoodEngine,
}

impl CognitiveCycle {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn MemoryStore>,
        traits: SharedTraits,
        actions: ActionSet,
        config: &AnimaConfig,
    ) -> Self {
        let locks = RecordLocks::new();
        let opinions = Arc::new(
            OpinionEngine::new(
                generator.clone(),
                store.clone(),
                traits.clone(),
                config.opinion.clone(),
            )
            .with_locks(locks.clone()),
        );
        let initiative = Arc::new(
            InitiativeLoop::new(
                generator.clone(),
                store.clone(),
                opinions.clone(),
                actions,
                config.initiative.clone(),
            )
            .with_locks(locks.clone()),
        );
        let desires = DesireEngine::new(
            generator.clone(),
            store.clone(),
            traits.clone(),
            config.desire.clone(),
        )
        .with_locks(locks)
        .with_initiative(initiative.clone());
        let mood = MoodEngine::from_config(generator, &config.mood);

        Self {
            store,
            traits,
            opinions,
            desires,
            initiative,
            mood,
        }
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    pub fn traits(&self) -> &SharedTraits {
        &self.traits
    }

    pub fn opinions(&self) -> &OpinionEngine {
        &self.opinions
    }

    pub fn desires(&self) -> &DesireEngine {
        &self.desires
    }

    pub fn initiative(&self) -> &InitiativeLoop {
        &self.initiative
    }

    pub fn mood(&self) -> &MoodEngine {
        &self.mood
    }

    /// Handle an answered conversational turn: start the background mood
    /// update, then memorise the exchange and run it through the cycle.
    pub async fn turn(&self, query: &str, answer: &str) -> CycleReport {
        self.mood.update(TurnContext::new(query, answer));
        let memory = MemoryRecord::new(
            format!("User: {}\nAssistant: {}", query, answer),
            MemorySubject::User,
            0.0,
        );
        self.observe(&memory).await
    }

    /// Memorise `memory` and propagate it through opinions and desires.
    pub async fn observe(&self, memory: &MemoryRecord) -> CycleReport {
        if let Err(e) = self.store.store_memory(memory).await {
            tracing::error!("Failed to store memory {}: {:#}", memory.id, e);
        }

        let mut report = CycleReport::default();
        let Some(opinions) = self.opinions.process_interaction(memory).await else {
            return report;
        };

        for opinion in &opinions {
            if let Some(desire) = self.desires.process_opinion(opinion).await {
                report.desires.push(desire);
            }
        }
        report.opinions = opinions;
        report
    }

    /// Resume initiatives for stored ACTIVE desires, i.e. desires that
    /// crossed the initiative threshold but whose initiative failed or was
    /// interrupted. Returns how many were attempted.
    pub async fn retry_pending(&self) -> usize {
        let active = match self.store.desires_with_status(DesireStatus::Active).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!("Failed to list active desires: {:#}", e);
                return 0;
            }
        };

        let mut attempted = 0;
        for desire in &active {
            self.initiative.process_initiative(desire).await;
            attempted += 1;
        }
        if attempted > 0 {
            tracing::info!("Retried {} interrupted initiative(s)", attempted);
        }
        attempted
    }
}
