//! # anima limbic
//!
//! Fast, non-verbal state regulation. Holds the session's PAD affect state,
//! nudges it after every answered turn on a detached task, and maps it to
//! voice synthesis parameters.
//!
//! The conversational path never waits on this crate: the response is
//! finalised first, then [`MoodEngine::update`] is dispatched and forgotten.

mod mood;

pub use mood::{MoodEngine, TurnContext};
