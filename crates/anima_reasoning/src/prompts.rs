use anima_core::{
    Dimension, DesireRecord, MemoryRecord, OpinionRecord, PadState, Scored, TraitProfile,
};

pub const OPINION_SYSTEM_PROMPT: &str = r#"You are the belief-forming module of a personal assistant.
Given one memory, state the single opinion it most informs.

Rules:
1. subject is a short, reusable label for the topic (e.g. "self-sacrifice", "early mornings")
2. polarity is the stance from -1.0 (strongly against) to 1.0 (strongly for)
3. confidence is how certain the stance is, from 0.0 to 1.0
4. main_dimension is the value dimension the topic touches most, or null
5. summary is one sentence; narrative is two or three sentences in first person

Reply with JSON only:
{"subject": "...", "summary": "...", "narrative": "...", "polarity": 0.0, "confidence": 0.0, "main_dimension": "..."}"#;

pub const DESIRE_SYSTEM_PROMPT: &str = r#"You are the motivation module of a personal assistant.
Given an opinion the assistant holds strongly, propose one concrete thing it would like to do about it.

Rules:
1. label is a short imperative phrase (e.g. "learn more about marine life")
2. description says what doing it would involve
3. reasoning links the desire back to the opinion

Reply with JSON only:
{"label": "...", "description": "...", "reasoning": "..."}"#;

pub const MOOD_SYSTEM_PROMPT: &str = r#"You are the affect module of a personal assistant.
Given the current mood in PAD space and the last exchange, estimate how the exchange moved the mood.
Each delta is small, typically between -0.3 and 0.3.

Reply with JSON only:
{"pleasure": 0.0, "arousal": 0.0, "dominance": 0.0}"#;

pub const INITIATIVE_SYSTEM_PROMPT: &str = "You are a personal assistant acting on your own initiative. \
Use the available tools when they help. Finish with a short first-person account of what you did and what came of it.";

pub fn dimension_list() -> String {
    Dimension::ALL
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn opinion_request(memory: &MemoryRecord) -> String {
    format!(
        "Memory (about {}, satisfaction {:.2}):\n{}\n\nValue dimensions: {}",
        memory.subject.as_str(),
        memory.satisfaction,
        memory.content,
        dimension_list()
    )
}

pub fn desire_request(opinion: &OpinionRecord, importance: f32) -> String {
    format!(
        "Opinion on \"{}\": {}\n{}\nPolarity {:.2}, confidence {:.2}, stability {:.2}. Importance to you: {:.0}/100.",
        opinion.subject,
        opinion.summary,
        opinion.narrative,
        opinion.polarity,
        opinion.confidence,
        opinion.stability,
        importance
    )
}

pub fn mood_request(pad: &PadState, query: &str, answer: &str) -> String {
    format!(
        "Current mood: pleasure {:.2}, arousal {:.2}, dominance {:.2} ({}).\n\nUser: {}\nAssistant: {}",
        pad.pleasure,
        pad.arousal,
        pad.dominance,
        pad.describe(),
        query,
        answer
    )
}

pub fn initiative_prompt(
    desire: &DesireRecord,
    memories: &[Scored<MemoryRecord>],
    opinions: &[Scored<OpinionRecord>],
) -> String {
    let mut prompt = format!(
        "You want to: {}\n{}\nWhy: {}\n",
        desire.label, desire.description, desire.reasoning
    );

    prompt.push_str("\n== RELATED MEMORIES ==\n");
    if memories.is_empty() {
        prompt.push_str("(none)\n");
    }
    for m in memories {
        prompt.push_str(&format!("- {}\n", m.record.content));
    }

    prompt.push_str("\n== RELATED OPINIONS ==\n");
    if opinions.is_empty() {
        prompt.push_str("(none)\n");
    }
    for o in opinions {
        prompt.push_str(&format!(
            "- {} (polarity {:.2}): {}\n",
            o.record.subject, o.record.polarity, o.record.summary
        ));
    }
    prompt
}

/// System prompt for answering the user in conversation.
pub fn conversation_system(traits: &TraitProfile, pad: &PadState) -> String {
    format!(
        "You are Anima, a personal assistant with opinions and moods of your own.\n\
         Personality: {}\nYou are currently feeling {}.\n\
         Answer naturally and briefly.",
        traits.describe(),
        pad.describe()
    )
}
