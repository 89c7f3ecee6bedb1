//! Lenient JSON extraction from model output.
//!
//! Models wrap structured answers in prose or markdown fences often enough
//! that a strict parse would discard usable drafts. The parser tries the raw
//! text, then a fenced code block, then the outermost `{...}` span.

use anima_core::CoreError;
use anyhow::Result;
use serde::de::DeserializeOwned;

/// Parse the first JSON object found in `text` as `T`.
pub fn parse_json_lenient<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<T>(inner) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    tracing::debug!("Could not parse model output as JSON: {}", trimmed);
    Err(CoreError::InvalidDraft(format!(
        "no JSON object in model output ({} chars)",
        trimmed.chars().count()
    ))
    .into())
}

/// Contents of the first ``` fenced block, without the language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_core::{DesireDraft, MoodDelta, OpinionDraft};

    #[test]
    fn test_parse_clean_json() {
        let json = r#"{"subject": "self-sacrifice", "polarity": 0.5, "confidence": 0.6}"#;
        let d: OpinionDraft = parse_json_lenient(json).unwrap();
        assert_eq!(d.subject, "self-sacrifice");
        assert_eq!(d.polarity, 0.5);
    }

    #[test]
    fn test_parse_code_block_wrapped() {
        let text = "Here you go:\n```json\n{\"label\": \"visit the sea\", \"description\": \"d\"}\n```\nHope that helps.";
        let d: DesireDraft = parse_json_lenient(text).unwrap();
        assert_eq!(d.label, "visit the sea");
    }

    #[test]
    fn test_parse_embedded_in_prose() {
        let text = r#"My mood shifted: {"pleasure": 0.2, "arousal": -0.1, "dominance": 0} overall."#;
        let d: MoodDelta = parse_json_lenient(text).unwrap();
        assert!((d.pleasure - 0.2).abs() < 1e-6);
        assert!((d.arousal + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_parse_garbage_is_invalid_draft() {
        let err = parse_json_lenient::<OpinionDraft>("I don't know how to parse this").unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert!(core.is_generation());
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        assert_eq!(fenced_block("```\n{\"a\":1}\n```"), Some("{\"a\":1}"));
        assert_eq!(fenced_block("no fence"), None);
    }
}
