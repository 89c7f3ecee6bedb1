//! Property-based tests for the mood engine.
//!
//! Whatever sequence of deltas the generator proposes, the session state
//! stays inside the PAD cube and the voice mapping inside its bounds.

use anima_core::{
    ActionSet, DesireDraft, Generator, MemoryRecord, MoodDelta, OpinionDraft, OpinionRecord,
    PadState,
};
use anima_limbic::{MoodEngine, TurnContext};
use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays a fixed list of deltas, one per call.
struct ScriptedDeltas {
    deltas: Mutex<Vec<MoodDelta>>,
}

#[async_trait]
impl Generator for ScriptedDeltas {
    async fn draft_opinion(&self, _m: &MemoryRecord) -> anyhow::Result<OpinionDraft> {
        anyhow::bail!("not used")
    }
    async fn draft_desire(&self, _o: &OpinionRecord, _i: f32) -> anyhow::Result<DesireDraft> {
        anyhow::bail!("not used")
    }
    async fn draft_mood_delta(&self, _p: &PadState, _q: &str, _a: &str) -> anyhow::Result<MoodDelta> {
        let mut deltas = self.deltas.lock().unwrap();
        if deltas.is_empty() {
            anyhow::bail!("script exhausted")
        }
        Ok(deltas.remove(0))
    }
    async fn run_initiative(&self, _p: &str, _a: &ActionSet) -> anyhow::Result<String> {
        anyhow::bail!("not used")
    }
}

fn arb_delta() -> impl Strategy<Value = MoodDelta> {
    (-3.0f32..=3.0, -3.0f32..=3.0, -3.0f32..=3.0).prop_map(|(p, a, d)| MoodDelta {
        pleasure: p,
        arousal: a,
        dominance: d,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mood_sequence_stays_bounded(deltas in proptest::collection::vec(arb_delta(), 1..12)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let n = deltas.len();
        let generator = Arc::new(ScriptedDeltas { deltas: Mutex::new(deltas) });
        let engine = MoodEngine::new(generator, PadState::neutral(), Duration::from_secs(1));

        rt.block_on(async {
            for _ in 0..n {
                engine.apply_turn(&TurnContext::new("q", "a")).await;
            }
        });

        let pad = engine.pad();
        for axis in [pad.pleasure, pad.arousal, pad.dominance] {
            prop_assert!((-1.0..=1.0).contains(&axis));
        }
        let voice = engine.current_voice_parameters();
        prop_assert!((0.5..=2.0).contains(&voice.length_scale));
        prop_assert!((0.1..=1.0).contains(&voice.noise_scale));
        prop_assert_eq!(voice, pad.voice_parameters());
    }
}
