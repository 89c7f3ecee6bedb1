//! Numeric helpers shared by every engine.
//!
//! All bounded quantities (polarity, confidence, stability, intensity, PAD
//! axes) pass through [`clamp_finite`] at the point of computation, so a NaN
//! coming out of a language-model draft collapses to zero instead of
//! propagating through the arithmetic.

use serde::{Deserialize, Deserializer};

/// Clamp `value` into `[min, max]`, mapping non-finite input to `0.0`
/// (itself clamped, for ranges that exclude zero).
pub fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    let v = if value.is_finite() { value } else { 0.0 };
    v.clamp(min, max)
}

/// Three-valued sign: `+1`, `-1`, or `0` for exactly zero (and NaN).
pub fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Lenient f32 deserializer: accepts numbers, numeric strings and `null`.
/// Anything unparseable becomes `0.0`.
pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let v = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0) as f32,
        Some(serde_json::Value::String(s)) => s.trim().parse::<f32>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if v.is_finite() { v } else { 0.0 })
}
