use crate::error::CoreError;
use crate::pad::PadState;
use crate::personality::{Trait, TraitProfile};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnimaConfig {
    pub llm: LlmConfig,
    pub opinion: OpinionConfig,
    pub desire: DesireConfig,
    pub initiative: InitiativeConfig,
    pub mood: MoodConfig,
    pub traits: TraitsConfig,
    pub memory: MemoryConfig,
}

impl AnimaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: AnimaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ANIMA_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("ANIMA_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("ANIMA_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("ANIMA_TRAIT_PRESET") {
            self.traits.preset = v;
        }
        if let Ok(v) = std::env::var("ANIMA_DB_PATH") {
            self.memory.db_path = v;
        }
        if let Ok(v) = std::env::var("ANIMA_EMBEDDER") {
            self.memory.embedder = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible endpoint) or "mock".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            max_tokens: 1024,
            temperature: 0.7,
            request_timeout_secs: 60,
        }
    }
}

/// Opinion revision parameters. The dynamics constants were tuned together
/// against the raw 0-100 importance scale; change them as a set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpinionConfig {
    /// Similarity at or above which a stored opinion is "the same opinion".
    pub similarity_threshold: f32,
    pub search_top_k: usize,
    pub draft_attempts: u32,
    pub draft_timeout_secs: u64,
    /// Weight of network consistency in the expected polarity (ρ).
    pub network_weight: f32,
    /// Confidence gain base on reinforcement (R).
    pub reinforce_rate: f32,
    /// Confidence loss base on contradiction (C).
    pub contradict_rate: f32,
    /// Stability gain base (G).
    pub stability_gain: f32,
    /// Stability loss base (S).
    pub stability_loss: f32,
}

impl Default for OpinionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            search_top_k: 5,
            draft_attempts: 1,
            draft_timeout_secs: 30,
            network_weight: 0.25,
            reinforce_rate: 0.05,
            contradict_rate: 0.08,
            stability_gain: 0.02,
            stability_loss: 0.03,
        }
    }
}

impl OpinionConfig {
    pub fn draft_timeout(&self) -> Duration {
        Duration::from_secs(self.draft_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DesireConfig {
    /// Minimum derived signal for a new desire to be drafted.
    pub creation_threshold: f32,
    /// Minimum intensity to trigger an autonomous initiative.
    pub initiative_threshold: f32,
    /// Weight of the previous intensity when blending in a new signal.
    pub smoothing: f32,
    /// Dimension average above which an antagonist counts as strong.
    pub strong_trait_threshold: f32,
    /// Multiplier applied per strong antagonist.
    pub conflict_penalty: f32,
    pub draft_attempts: u32,
    pub draft_timeout_secs: u64,
}

impl Default for DesireConfig {
    fn default() -> Self {
        Self {
            creation_threshold: 0.5,
            initiative_threshold: 0.8,
            smoothing: 0.7,
            strong_trait_threshold: 70.0,
            conflict_penalty: 0.8,
            draft_attempts: 3,
            draft_timeout_secs: 30,
        }
    }
}

impl DesireConfig {
    pub fn draft_timeout(&self) -> Duration {
        Duration::from_secs(self.draft_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InitiativeConfig {
    pub context_memories: usize,
    pub context_opinions: usize,
    /// Upper bound on tool-use round trips within one initiative.
    pub max_tool_rounds: usize,
    pub timeout_secs: u64,
}

impl Default for InitiativeConfig {
    fn default() -> Self {
        Self {
            context_memories: 5,
            context_opinions: 5,
            max_tool_rounds: 4,
            timeout_secs: 120,
        }
    }
}

impl InitiativeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub timeout_secs: u64,
    pub initial: PadState,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            initial: PadState::neutral(),
        }
    }
}

impl MoodConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TraitsConfig {
    pub preset: String,
    /// Explicit per-trait scores layered on top of the preset.
    pub scores: HashMap<String, f32>,
}

impl Default for TraitsConfig {
    fn default() -> Self {
        Self {
            preset: "balanced".to_string(),
            scores: HashMap::new(),
        }
    }
}

impl TraitsConfig {
    pub fn to_profile(&self) -> Result<TraitProfile> {
        let mut profile = TraitProfile::from_preset(&self.preset)?;
        for (name, score) in &self.scores {
            let t = Trait::parse_str(name).ok_or_else(|| CoreError::UnknownTrait(name.clone()))?;
            profile.set_score(t, *score);
        }
        Ok(profile)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub db_path: String,
    /// `"fastembed"` for semantic embeddings, `"hash"` for the offline
    /// lexical embedder.
    pub embedder: String,
    /// Vector size of the hash embedder. The fastembed model fixes its own.
    pub embedding_dims: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: "anima.db".to_string(),
            embedder: "fastembed".to_string(),
            embedding_dims: 256,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
