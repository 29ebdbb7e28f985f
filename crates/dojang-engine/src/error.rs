//! Engine error types.

use thiserror::Error;

/// Errors that can occur in the engine.
///
/// Shortfalls in availability (fewer items than requested) are never errors;
/// selection simply returns what exists.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Not enough distinct answers to build a four-option question.
    #[error("Insufficient candidates: need {needed} distinct answers, catalog has {available}")]
    InsufficientCandidates { needed: usize, available: usize },

    /// Catalog defines no categories.
    #[error("Catalog defines no categories")]
    NoCategories,

    /// Catalog failed validation.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rank not present in the ladder.
    #[error("Unknown rank: {0}")]
    UnknownRank(String),

    /// Item not present in the catalog.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Session has not been started.
    #[error("Session has not been started")]
    SessionNotStarted,

    /// Session already completed.
    #[error("Session already completed")]
    SessionCompleted,

    /// Session has not been completed yet.
    #[error("Session is not completed; results are only available after completion")]
    SessionNotCompleted,

    /// Advance requested with no cards left.
    #[error("Cannot advance past the end of the session (index {index} of {len})")]
    AdvancePastEnd { index: usize, len: usize },

    /// No card at the current position.
    #[error("No current card at index {index}")]
    NoCurrentCard { index: usize },

    /// Test mode requires an answer before moving on.
    #[error("An answer is required before advancing from card {index}")]
    AnswerRequired { index: usize },

    /// Test mode never moves backwards.
    #[error("Rewinding is not allowed in test sessions")]
    RewindNotAllowed,

    /// Action not available in the session's mode.
    #[error("{action} is not permitted in {mode} sessions")]
    NotPermitted { action: &'static str, mode: &'static str },

    /// Selected option is out of range.
    #[error("Selected option {selected} is out of range (question has {options} options)")]
    InvalidOption { selected: usize, options: usize },

    /// Multiple-choice answer given for a plain card, or the reverse.
    #[error("Answer kind does not match card at index {index}: {reason}")]
    AnswerKindMismatch { index: usize, reason: &'static str },

    /// Saved session state is inconsistent.
    #[error("Invalid session snapshot: {0}")]
    InvalidSnapshot(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error.
    #[error("TOML error: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
