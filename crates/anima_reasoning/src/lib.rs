//! # anima reasoning
//!
//! The slow loop of the cognitive core. Memories become opinions through
//! numeric belief revision ([`OpinionEngine`]), important opinions become
//! desires ([`DesireEngine`]), and intense desires trigger autonomous
//! action ([`InitiativeLoop`]) whose outcome is memorised again.
//! [`CognitiveCycle`] wires the pieces together.

pub mod api_types;
pub mod cycle;
pub mod desire;
pub mod extraction;
pub mod generator;
pub mod initiative;
pub mod llm;
pub mod opinion;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use cycle::{CognitiveCycle, CycleReport};
pub use desire::{desire_signal, DesireEngine};
pub use generator::LlmGenerator;
pub use initiative::InitiativeLoop;
pub use llm::{CompletionParams, LlmClient};
pub use opinion::{OpinionDynamics, OpinionEngine, Revision};
