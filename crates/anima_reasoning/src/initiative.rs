//! Autonomous initiatives.
//!
//! An ACTIVE desire is acted upon without user prompting: related memories
//! and opinions are gathered as context, the generator runs a tool-enabled
//! chat with the available actions, and the account it gives is memorised
//! and fed back to the opinion engine. A completed run marks the desire
//! SATISFIED; the outcome itself is not judged. Any failure leaves the
//! desire ACTIVE for [`CognitiveCycle::retry_pending`].
//!
//! [`CognitiveCycle::retry_pending`]: crate::CognitiveCycle::retry_pending

use crate::opinion::OpinionEngine;
use crate::prompts;
use anima_core::config::InitiativeConfig;
use anima_core::{
    ActionSet, CoreError, DesireRecord, DesireStatus, Generator, MemoryRecord, MemoryStore,
    RecordLocks,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct InitiativeLoop {
    generator: Arc<dyn Generator>,
    store: Arc<dyn MemoryStore>,
    opinions: Arc<OpinionEngine>,
    actions: ActionSet,
    config: InitiativeConfig,
    locks: RecordLocks,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Marks a desire as being acted upon until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

impl InitiativeLoop {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn MemoryStore>,
        opinions: Arc<OpinionEngine>,
        actions: ActionSet,
        config: InitiativeConfig,
    ) -> Self {
        Self {
            generator,
            store,
            opinions,
            actions,
            config,
            locks: RecordLocks::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_locks(mut self, locks: RecordLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    fn begin(&self, id: Uuid) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            id,
        })
    }

    /// Act on one desire. Never fails: errors are logged and the desire is
    /// left as stored. A desire already being acted upon is skipped, and so
    /// is one whose stored record is gone or terminal, whatever the status
    /// of the caller's copy.
    pub async fn process_initiative(&self, desire: &DesireRecord) {
        if desire.status.is_terminal() {
            tracing::debug!("Desire {} is already {}", desire.id, desire.status);
            return;
        }
        let Some(_in_flight) = self.begin(desire.id) else {
            tracing::debug!("Initiative for desire {} already running", desire.id);
            return;
        };

        match self.store.get_desire(desire.id).await {
            Ok(Some(stored)) if stored.status.is_terminal() => {
                tracing::debug!("Desire {} is stored as {}; not acting", desire.id, stored.status);
                return;
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!("Desire {} is no longer stored; not acting", desire.id);
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to load desire {} before acting: {:#}", desire.id, e);
                return;
            }
        }

        match self.run(desire).await {
            Ok(()) => tracing::info!("Initiative for desire {} '{}' done", desire.id, desire.label),
            Err(e) => tracing::warn!(
                "Initiative for desire {} '{}' failed: {:#}",
                desire.id,
                desire.label,
                e
            ),
        }
    }

    async fn run(&self, desire: &DesireRecord) -> Result<()> {
        let memories = self
            .store
            .search_memories(&desire.label, self.config.context_memories)
            .await
            .context("Failed to gather related memories")?;
        let opinions = self
            .store
            .search_opinions(&desire.label, self.config.context_opinions)
            .await
            .context("Failed to gather related opinions")?;

        let prompt = prompts::initiative_prompt(desire, &memories, &opinions);
        let timeout = self.config.timeout();
        let account = tokio::time::timeout(
            timeout,
            self.generator.run_initiative(&prompt, &self.actions),
        )
        .await
        .map_err(|_| CoreError::Timeout {
            operation: "initiative",
            secs: timeout.as_secs(),
        })?
        .context("Initiative run failed")?;

        let memory = MemoryRecord::auto_generated(format!(
            "I acted on my wish to {}. {}",
            desire.label,
            account.trim()
        ));
        self.store
            .store_memory(&memory)
            .await
            .context("Failed to memorise initiative outcome")?;

        match self.opinions.process_interaction(&memory).await {
            Some(revised) => tracing::debug!(
                "Initiative outcome touched {} opinion(s)",
                revised.len()
            ),
            None => tracing::debug!("Initiative outcome formed no opinion"),
        }

        self.transition(desire.id, DesireStatus::Satisfied).await?;
        Ok(())
    }

    /// Give up on a desire. Returns the stored record afterwards, or `None`
    /// if it does not exist or the store failed.
    pub async fn abandon(&self, desire_id: Uuid) -> Option<DesireRecord> {
        match self.transition(desire_id, DesireStatus::Abandoned).await {
            Ok(desire) => desire,
            Err(e) => {
                tracing::error!("Failed to abandon desire {}: {:#}", desire_id, e);
                None
            }
        }
    }

    /// Move a stored desire into a terminal status. Terminal desires are
    /// left as they are.
    async fn transition(&self, id: Uuid, status: DesireStatus) -> Result<Option<DesireRecord>> {
        let _guard = self.locks.lock(id).await;

        let Some(mut desire) = self
            .store
            .get_desire(id)
            .await
            .with_context(|| format!("Failed to load desire {}", id))?
        else {
            tracing::warn!("Desire {} not found; cannot mark {}", id, status);
            return Ok(None);
        };

        if desire.status.is_terminal() {
            return Ok(Some(desire));
        }

        desire.status = status;
        desire.updated_at = Utc::now();
        self.store
            .upsert_desire(&desire)
            .await
            .with_context(|| format!("Failed to mark desire {} {}", id, status))?;
        tracing::info!("Desire {} '{}' is now {}", id, desire.label, status);
        Ok(Some(desire))
    }
}
