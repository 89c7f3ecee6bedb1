//! Affect model based on Mehrabian's PAD space.
//!
//! Three continuous axes, each in `[-1, 1]`:
//! - Pleasure: unpleasant ↔ pleasant
//! - Arousal: calm ↔ activated
//! - Dominance: submissive ↔ in control
//!
//! The state is nudged additively after every conversational turn and read
//! by the voice-parameter mapping.

use crate::math::{clamp_finite, deserialize_safe_f32};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PadState {
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub pleasure: f32,
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,
    #[serde(default, deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
}

impl PadState {
    pub fn new(pleasure: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            pleasure: clamp_finite(pleasure, -1.0, 1.0),
            arousal: clamp_finite(arousal, -1.0, 1.0),
            dominance: clamp_finite(dominance, -1.0, 1.0),
        }
    }

    pub fn neutral() -> Self {
        Self::default()
    }

    /// Additive update; every axis is clamped after the addition.
    pub fn update(&mut self, d_pleasure: f32, d_arousal: f32, d_dominance: f32) {
        self.pleasure = clamp_finite(self.pleasure + sanitize(d_pleasure), -1.0, 1.0);
        self.arousal = clamp_finite(self.arousal + sanitize(d_arousal), -1.0, 1.0);
        self.dominance = clamp_finite(self.dominance + sanitize(d_dominance), -1.0, 1.0);
    }

    /// Euclidean distance in PAD space.
    pub fn distance_to(&self, other: &PadState) -> f32 {
        ((self.pleasure - other.pleasure).powi(2)
            + (self.arousal - other.arousal).powi(2)
            + (self.dominance - other.dominance).powi(2))
        .sqrt()
    }

    /// Voice synthesis parameters for the current affect.
    pub fn voice_parameters(&self) -> VoiceParameters {
        VoiceParameters::from_pad(self)
    }

    /// Coarse octant label, for prompt injection.
    pub fn describe(&self) -> &'static str {
        if self.distance_to(&PadState::neutral()) < 0.2 {
            return "neutral";
        }
        match (self.pleasure >= 0.0, self.arousal >= 0.0, self.dominance >= 0.0) {
            (true, true, true) => "exuberant",
            (true, true, false) => "dependent",
            (true, false, true) => "relaxed",
            (true, false, false) => "docile",
            (false, true, true) => "hostile",
            (false, true, false) => "anxious",
            (false, false, true) => "disdainful",
            (false, false, false) => "bored",
        }
    }
}

fn sanitize(delta: f32) -> f32 {
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

/// Parameters consumed by the speech synthesiser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    /// Speaking rate; below 1.0 is faster.
    pub length_scale: f32,
    /// Expressiveness of the generated audio.
    pub noise_scale: f32,
    /// Phoneme duration variance.
    pub noise_w: f32,
}

impl VoiceParameters {
    pub const BASE_LENGTH_SCALE: f32 = 1.0;
    pub const BASE_NOISE_SCALE: f32 = 0.667;
    pub const NOISE_W: f32 = 0.8;

    /// Pure mapping from affect to voice. Only arousal is wired in; dominance
    /// and pleasure currently have no audible effect.
    pub fn from_pad(pad: &PadState) -> Self {
        Self {
            length_scale: clamp_finite(Self::BASE_LENGTH_SCALE - pad.arousal * 0.2, 0.5, 2.0),
            noise_scale: clamp_finite(Self::BASE_NOISE_SCALE + pad.arousal * 0.1, 0.1, 1.0),
            noise_w: Self::NOISE_W,
        }
    }
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self::from_pad(&PadState::neutral())
    }
}
