//! Session mood: the PAD state and its fire-and-forget update path.
//!
//! After a turn has been answered the caller hands the exchange to
//! [`MoodEngine::update`] and moves on. A detached task asks the generator
//! for a mood delta and folds it into the state. Nobody awaits the task; a
//! failed or timed-out draft leaves the state untouched, and an update lost
//! to shutdown is acceptable.

use anima_core::config::MoodConfig;
use anima_core::{Generator, PadState, VoiceParameters};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// One answered conversational turn.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub query: String,
    pub answer: String,
}

impl TurnContext {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
        }
    }
}

/// Owns the affect state of one conversation session.
#[derive(Clone)]
pub struct MoodEngine {
    pad: Arc<RwLock<PadState>>,
    generator: Arc<dyn Generator>,
    timeout: Duration,
    /// Watch channel for state updates (voice layer subscribes to this)
    pad_watch_tx: Arc<watch::Sender<PadState>>,
}

impl MoodEngine {
    pub fn new(generator: Arc<dyn Generator>, initial: PadState, timeout: Duration) -> Self {
        let (pad_watch_tx, _) = watch::channel(initial);
        Self {
            pad: Arc::new(RwLock::new(initial)),
            generator,
            timeout,
            pad_watch_tx: Arc::new(pad_watch_tx),
        }
    }

    pub fn from_config(generator: Arc<dyn Generator>, config: &MoodConfig) -> Self {
        Self::new(generator, config.initial, config.timeout())
    }

    /// Dispatch a background mood update for a finished turn. Returns
    /// immediately; the effect becomes visible once the task completes.
    pub fn update(&self, turn: TurnContext) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                tracing::warn!("Mood update skipped: no async runtime available");
                return;
            }
        };
        let engine = self.clone();
        handle.spawn(async move {
            engine.apply_turn(&turn).await;
        });
    }

    /// The body of a mood update. Returns whether the state changed.
    pub async fn apply_turn(&self, turn: &TurnContext) -> bool {
        let current = *self.pad.read().await;

        let drafted = tokio::time::timeout(
            self.timeout,
            self.generator
                .draft_mood_delta(&current, &turn.query, &turn.answer),
        )
        .await;

        let delta = match drafted {
            Ok(Ok(delta)) => match delta.validate() {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Mood delta rejected: {}", e);
                    return false;
                }
            },
            Ok(Err(e)) => {
                tracing::warn!("Mood delta generation failed (non-fatal): {}", e);
                return false;
            }
            Err(_) => {
                tracing::warn!(
                    "Mood delta generation timed out ({}s)",
                    self.timeout.as_secs()
                );
                return false;
            }
        };

        let updated = {
            let mut pad = self.pad.write().await;
            pad.update(delta.pleasure, delta.arousal, delta.dominance);
            // Publish under the write lock so the watch never lags the state.
            self.pad_watch_tx.send_replace(*pad);
            *pad
        };

        tracing::debug!(
            "Mood updated: P={:.2} A={:.2} D={:.2} ({})",
            updated.pleasure,
            updated.arousal,
            updated.dominance,
            updated.describe()
        );
        true
    }

    /// Snapshot of the current affect state.
    pub fn pad(&self) -> PadState {
        *self.pad_watch_tx.borrow()
    }

    /// Voice synthesis parameters for the current affect state.
    pub fn current_voice_parameters(&self) -> VoiceParameters {
        self.pad().voice_parameters()
    }

    /// Receive every published PAD state.
    pub fn subscribe(&self) -> watch::Receiver<PadState> {
        self.pad_watch_tx.subscribe()
    }

    /// Administrative reset, e.g. at the start of a new session.
    pub async fn reset(&self, pad: PadState) {
        let mut guard = self.pad.write().await;
        *guard = pad;
        self.pad_watch_tx.send_replace(pad);
    }
}

impl std::fmt::Debug for MoodEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoodEngine")
            .field("pad", &self.pad())
            .field("timeout", &self.timeout)
            .finish()
    }
}
