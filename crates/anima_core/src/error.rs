//! Failure taxonomy of the cognitive core.
//!
//! Engines never surface these to their callers: generation and store
//! failures are logged and degrade to "no update produced". The enum exists
//! so collaborators can report a classified cause through `anyhow` and the
//! engines (or tests) can downcast when the distinction matters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The generator call failed outright.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The generator answered, but the draft did not pass presence validation.
    #[error("invalid draft: {0}")]
    InvalidDraft(String),

    /// A bounded collaborator call exceeded its deadline.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// Vector store read or write failure.
    #[error("store failure: {0}")]
    Store(String),

    #[error("unknown trait: {0}")]
    UnknownTrait(String),

    #[error("unknown trait preset: {0}")]
    UnknownPreset(String),
}

impl CoreError {
    /// Generation-class failures are recovered by retry and never fatal.
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            CoreError::Generation(_) | CoreError::InvalidDraft(_) | CoreError::Timeout { .. }
        )
    }
}
