//! # anima core
//!
//! Shared vocabulary of the cognitive core: the long-lived records
//! (memories, opinions, desires), the personality profile that weighs every
//! revision, the PAD affect state, and the contracts of the external
//! collaborators (language model, vector store, action capabilities).

pub mod action;
pub mod config;
pub mod error;
pub mod generator;
pub mod locks;
pub mod math;
pub mod pad;
pub mod personality;
pub mod records;
pub mod store;

pub use action::{Action, ActionInputSchema, ActionOutcome, ActionSet, ActionSpec};
pub use config::AnimaConfig;
pub use error::CoreError;
pub use generator::{DesireDraft, Generator, MoodDelta, OpinionDraft};
pub use locks::RecordLocks;
pub use pad::{PadState, VoiceParameters};
pub use personality::{Dimension, SharedTraits, Trait, TraitProfile};
pub use records::{
    DesireRecord, DesireStatus, Embedding, MemoryRecord, MemorySubject, OpinionRecord,
};
pub use store::{MemoryStore, Scored};
