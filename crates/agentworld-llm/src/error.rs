//! Error types for generation calls.
//!
//! Every variant is recoverable: dispatchers turn any [`GenerationError`]
//! into a template fallback, so these never reach an observer.

/// Errors that can occur while generating text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// No backend is configured for this call, or generation is disabled.
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within its deadline.
    #[error("generation timed out after {timeout_ms} ms")]
    Timeout {
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },

    /// The backend returned an error or was unreachable.
    #[error("generation backend error: {0}")]
    Backend(String),

    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// The backend answered with no usable text.
    #[error("generation backend returned an empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Build a [`GenerationError::Timeout`] from a duration.
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
