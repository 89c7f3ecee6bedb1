//! Personality profile: ten scored traits grouped into four higher-order
//! dimensions (openness to change, self-enhancement, conservation,
//! self-transcendence).
//!
//! The engines only ever read the profile. It weighs belief revision
//! (importance, coherence, network consistency) and desire formation
//! (value alignment). Administrative changes go through [`SharedTraits`],
//! which swaps in a whole new profile so readers never observe a half-edited
//! one.

use crate::error::CoreError;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub const MIN_SCORE: f32 = 0.0;
pub const MAX_SCORE: f32 = 100.0;
pub const NEUTRAL_SCORE: f32 = 50.0;

// ============================================================================
// Dimensions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    OpennessToChange,
    SelfEnhancement,
    Conservation,
    SelfTranscendence,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::OpennessToChange,
        Dimension::SelfEnhancement,
        Dimension::Conservation,
        Dimension::SelfTranscendence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::OpennessToChange => "openness_to_change",
            Dimension::SelfEnhancement => "self_enhancement",
            Dimension::Conservation => "conservation",
            Dimension::SelfTranscendence => "self_transcendence",
        }
    }

    /// Lenient parse ignoring separators and casing, since the value usually
    /// comes out of a language-model draft.
    pub fn parse_str(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match norm.as_str() {
            "opennesstochange" | "openness" => Some(Dimension::OpennessToChange),
            "selfenhancement" => Some(Dimension::SelfEnhancement),
            "conservation" => Some(Dimension::Conservation),
            "selftranscendence" => Some(Dimension::SelfTranscendence),
            _ => None,
        }
    }

    pub fn traits(&self) -> &'static [Trait] {
        match self {
            Dimension::OpennessToChange => {
                &[Trait::SelfDirection, Trait::Stimulation, Trait::Hedonism]
            }
            Dimension::SelfEnhancement => &[Trait::Achievement, Trait::Power],
            Dimension::Conservation => &[Trait::Security, Trait::Conformity, Trait::Tradition],
            Dimension::SelfTranscendence => &[Trait::Benevolence, Trait::Universalism],
        }
    }

    /// Registered antagonists: dimensions whose strength works against this one.
    pub fn antagonists(&self) -> &'static [Dimension] {
        match self {
            Dimension::OpennessToChange => &[Dimension::Conservation],
            Dimension::Conservation => &[Dimension::OpennessToChange],
            Dimension::SelfEnhancement => &[Dimension::SelfTranscendence],
            Dimension::SelfTranscendence => &[Dimension::SelfEnhancement],
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Traits
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    SelfDirection,
    Stimulation,
    Hedonism,
    Achievement,
    Power,
    Security,
    Conformity,
    Tradition,
    Benevolence,
    Universalism,
}

impl Trait {
    pub const ALL: [Trait; 10] = [
        Trait::SelfDirection,
        Trait::Stimulation,
        Trait::Hedonism,
        Trait::Achievement,
        Trait::Power,
        Trait::Security,
        Trait::Conformity,
        Trait::Tradition,
        Trait::Benevolence,
        Trait::Universalism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trait::SelfDirection => "self_direction",
            Trait::Stimulation => "stimulation",
            Trait::Hedonism => "hedonism",
            Trait::Achievement => "achievement",
            Trait::Power => "power",
            Trait::Security => "security",
            Trait::Conformity => "conformity",
            Trait::Tradition => "tradition",
            Trait::Benevolence => "benevolence",
            Trait::Universalism => "universalism",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        let norm = s.trim().to_lowercase().replace([' ', '-'], "_");
        Trait::ALL.into_iter().find(|t| t.as_str() == norm)
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Trait::SelfDirection | Trait::Stimulation | Trait::Hedonism => {
                Dimension::OpennessToChange
            }
            Trait::Achievement | Trait::Power => Dimension::SelfEnhancement,
            Trait::Security | Trait::Conformity | Trait::Tradition => Dimension::Conservation,
            Trait::Benevolence | Trait::Universalism => Dimension::SelfTranscendence,
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TraitProfile
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitProfile {
    scores: BTreeMap<Trait, f32>,
}

impl Default for TraitProfile {
    fn default() -> Self {
        Self::balanced()
    }
}

impl TraitProfile {
    /// Every trait at the neutral midpoint.
    pub fn balanced() -> Self {
        Self {
            scores: Trait::ALL.into_iter().map(|t| (t, NEUTRAL_SCORE)).collect(),
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["balanced", "curious", "caring", "ambitious", "traditional"]
    }

    pub fn from_preset(name: &str) -> Result<Self, CoreError> {
        let overrides: &[(Trait, f32)] = match name.trim().to_lowercase().as_str() {
            "balanced" => &[],
            "curious" => &[
                (Trait::SelfDirection, 80.0),
                (Trait::Stimulation, 85.0),
                (Trait::Hedonism, 65.0),
                (Trait::Security, 35.0),
                (Trait::Conformity, 30.0),
                (Trait::Tradition, 30.0),
            ],
            "caring" => &[
                (Trait::Benevolence, 85.0),
                (Trait::Universalism, 80.0),
                (Trait::Achievement, 45.0),
                (Trait::Power, 25.0),
            ],
            "ambitious" => &[
                (Trait::Achievement, 85.0),
                (Trait::Power, 75.0),
                (Trait::Benevolence, 40.0),
                (Trait::Universalism, 40.0),
            ],
            "traditional" => &[
                (Trait::Security, 80.0),
                (Trait::Conformity, 75.0),
                (Trait::Tradition, 85.0),
                (Trait::SelfDirection, 40.0),
                (Trait::Stimulation, 30.0),
            ],
            other => return Err(CoreError::UnknownPreset(other.to_string())),
        };

        let mut profile = Self::balanced();
        for (t, score) in overrides {
            profile.set_score(*t, *score);
        }
        Ok(profile)
    }

    /// Build from explicit `name -> score` pairs. Traits not mentioned stay
    /// at the neutral midpoint; unknown names are rejected.
    pub fn from_scores(scores: &HashMap<String, f32>) -> Result<Self, CoreError> {
        let mut profile = Self::balanced();
        for (name, score) in scores {
            let t = Trait::parse_str(name).ok_or_else(|| CoreError::UnknownTrait(name.clone()))?;
            profile.set_score(t, *score);
        }
        Ok(profile)
    }

    pub fn score(&self, t: Trait) -> f32 {
        self.scores.get(&t).copied().unwrap_or(NEUTRAL_SCORE)
    }

    /// Administrative mutation. Scores are clamped into `[0, 100]`.
    pub fn set_score(&mut self, t: Trait, score: f32) {
        let score = if score.is_finite() {
            score.clamp(MIN_SCORE, MAX_SCORE)
        } else {
            NEUTRAL_SCORE
        };
        self.scores.insert(t, score);
    }

    pub fn dimension_average(&self, dim: Dimension) -> f32 {
        let traits = dim.traits();
        traits.iter().map(|t| self.score(*t)).sum::<f32>() / traits.len() as f32
    }

    /// Mean over all individual trait scores.
    pub fn overall_average(&self) -> f32 {
        Trait::ALL.iter().map(|t| self.score(*t)).sum::<f32>() / Trait::ALL.len() as f32
    }

    pub fn dimension_averages(&self) -> BTreeMap<Dimension, f32> {
        Dimension::ALL
            .into_iter()
            .map(|d| (d, self.dimension_average(d)))
            .collect()
    }

    pub fn max_dimension_average(&self) -> f32 {
        Dimension::ALL
            .into_iter()
            .map(|d| self.dimension_average(d))
            .fold(f32::MIN, f32::max)
    }

    /// Dimension with the highest average. Ties resolve to declaration order.
    pub fn dominant_dimension(&self) -> Dimension {
        let mut best = Dimension::ALL[0];
        let mut best_avg = self.dimension_average(best);
        for d in Dimension::ALL.into_iter().skip(1) {
            let avg = self.dimension_average(d);
            if avg > best_avg {
                best = d;
                best_avg = avg;
            }
        }
        best
    }

    /// Importance weight of an (optional) dimension on the raw 0-100 scale.
    /// Untagged opinions weigh in at the overall average.
    pub fn importance(&self, dim: Option<Dimension>) -> f32 {
        match dim {
            Some(d) => self.dimension_average(d),
            None => self.overall_average(),
        }
    }

    /// Conflict-penalised normalisation of a dimension's average.
    ///
    /// Starts at `average / 100`; every antagonist dimension whose average
    /// exceeds `strong_threshold` multiplies the result by `penalty`.
    pub fn value_alignment(&self, dim: Dimension, strong_threshold: f32, penalty: f32) -> f32 {
        let mut alignment = self.dimension_average(dim) / MAX_SCORE;
        for other in Dimension::ALL.into_iter().filter(|d| *d != dim) {
            if dim.antagonists().contains(&other)
                && self.dimension_average(other) > strong_threshold
            {
                alignment *= penalty;
            }
        }
        alignment.clamp(0.0, 1.0)
    }

    /// One-line rendering for prompts and the terminal.
    pub fn describe(&self) -> String {
        Dimension::ALL
            .into_iter()
            .map(|d| format!("{}={:.0}", d, self.dimension_average(d)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// SharedTraits
// ============================================================================

/// Read-mostly handle to the live profile.
///
/// Engines take cheap snapshots with [`SharedTraits::snapshot`]; writers
/// publish a complete replacement.
#[derive(Clone)]
pub struct SharedTraits {
    inner: Arc<ArcSwap<TraitProfile>>,
}

impl SharedTraits {
    pub fn new(profile: TraitProfile) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(profile)),
        }
    }

    pub fn snapshot(&self) -> Arc<TraitProfile> {
        self.inner.load_full()
    }

    pub fn replace(&self, profile: TraitProfile) {
        tracing::info!("Trait profile replaced: {}", profile.describe());
        self.inner.store(Arc::new(profile));
    }

    pub fn set_score(&self, t: Trait, score: f32) {
        self.inner.rcu(|current| {
            let mut next = TraitProfile::clone(current);
            next.set_score(t, score);
            next
        });
        tracing::info!("Trait '{}' set to {:.1}", t, self.snapshot().score(t));
    }
}

impl Default for SharedTraits {
    fn default() -> Self {
        Self::new(TraitProfile::default())
    }
}

impl fmt::Debug for SharedTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedTraits").field(&*self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_averages() {
        let p = TraitProfile::balanced();
        for d in Dimension::ALL {
            assert_eq!(p.dimension_average(d), 50.0);
        }
        assert_eq!(p.overall_average(), 50.0);
        assert_eq!(p.max_dimension_average(), 50.0);
    }

    #[test]
    fn test_every_trait_belongs_to_its_dimension() {
        for t in Trait::ALL {
            assert!(t.dimension().traits().contains(&t));
        }
        let total: usize = Dimension::ALL.iter().map(|d| d.traits().len()).sum();
        assert_eq!(total, Trait::ALL.len());
    }

    #[test]
    fn test_antagonists_are_symmetric() {
        for d in Dimension::ALL {
            for a in d.antagonists() {
                assert!(a.antagonists().contains(&d));
            }
        }
    }

    #[test]
    fn test_set_score_clamps() {
        let mut p = TraitProfile::balanced();
        p.set_score(Trait::Power, 140.0);
        assert_eq!(p.score(Trait::Power), 100.0);
        p.set_score(Trait::Power, -3.0);
        assert_eq!(p.score(Trait::Power), 0.0);
        p.set_score(Trait::Power, f32::NAN);
        assert_eq!(p.score(Trait::Power), 50.0);
    }

    #[test]
    fn test_presets() {
        let curious = TraitProfile::from_preset("curious").unwrap();
        assert_eq!(curious.dominant_dimension(), Dimension::OpennessToChange);
        let caring = TraitProfile::from_preset("Caring").unwrap();
        assert_eq!(caring.dominant_dimension(), Dimension::SelfTranscendence);
        assert!(matches!(
            TraitProfile::from_preset("chaotic"),
            Err(CoreError::UnknownPreset(_))
        ));
        for name in TraitProfile::preset_names() {
            assert!(TraitProfile::from_preset(name).is_ok());
        }
    }

    #[test]
    fn test_from_scores_rejects_unknown_trait() {
        let mut scores = HashMap::new();
        scores.insert("benevolence".to_string(), 90.0);
        let p = TraitProfile::from_scores(&scores).unwrap();
        assert_eq!(p.score(Trait::Benevolence), 90.0);
        assert_eq!(p.score(Trait::Power), 50.0);

        scores.insert("telepathy".to_string(), 10.0);
        assert!(matches!(
            TraitProfile::from_scores(&scores),
            Err(CoreError::UnknownTrait(_))
        ));
    }

    #[test]
    fn test_value_alignment_without_conflict() {
        let p = TraitProfile::balanced();
        let a = p.value_alignment(Dimension::SelfTranscendence, 70.0, 0.8);
        assert!((a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_value_alignment_penalised_by_strong_antagonist() {
        let mut p = TraitProfile::balanced();
        p.set_score(Trait::Achievement, 90.0);
        p.set_score(Trait::Power, 80.0);
        // self_enhancement = 85 > 70 and antagonises self_transcendence
        let a = p.value_alignment(Dimension::SelfTranscendence, 70.0, 0.8);
        assert!((a - 0.4).abs() < 1e-6);
        // conservation is not an antagonist of self_transcendence
        let mut q = TraitProfile::balanced();
        q.set_score(Trait::Security, 95.0);
        q.set_score(Trait::Conformity, 95.0);
        q.set_score(Trait::Tradition, 95.0);
        let b = q.value_alignment(Dimension::SelfTranscendence, 70.0, 0.8);
        assert!((b - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_importance_of_untagged_uses_overall() {
        let p = TraitProfile::from_preset("ambitious").unwrap();
        assert_eq!(p.importance(None), p.overall_average());
        assert_eq!(
            p.importance(Some(Dimension::SelfEnhancement)),
            p.dimension_average(Dimension::SelfEnhancement)
        );
    }

    #[test]
    fn test_dimension_parse_lenient() {
        assert_eq!(Dimension::parse_str("Self Transcendence"), Some(Dimension::SelfTranscendence));
        assert_eq!(Dimension::parse_str("openness-to-change"), Some(Dimension::OpennessToChange));
        assert_eq!(Dimension::parse_str("SelfEnhancement"), Some(Dimension::SelfEnhancement));
        assert_eq!(Dimension::parse_str("vibes"), None);
    }

    #[test]
    fn test_shared_traits_set_score_publishes() {
        let shared = SharedTraits::default();
        let before = shared.snapshot();
        shared.set_score(Trait::Tradition, 90.0);
        assert_eq!(before.score(Trait::Tradition), 50.0);
        assert_eq!(shared.snapshot().score(Trait::Tradition), 90.0);
    }
}
