//! Error taxonomy for the analysis engine
//!
//! Only two of these are fatal: `CorpusLoad` at construction time and
//! `Persistence` on a feedback write. A missing classifier degrades to
//! taxonomy-only scoring and never surfaces here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed corpus input tables. Raised only during engine construction.
    #[error("corpus load failed: {0}")]
    CorpusLoad(String),

    /// Classifier model could not be built. Callers that see this chose to
    /// treat degradation as an error; the engine itself falls back to
    /// taxonomy-only scoring instead.
    #[error("classifier unavailable: {0}")]
    ClassifierLoad(String),

    /// Feedback referenced an event id that is not in the query store.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Feedback signal was not "positive" or "negative".
    #[error("invalid feedback signal: {0}")]
    InvalidFeedback(String),

    /// A query-store append or feedback update failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// The query was empty after normalization.
    #[error("query is empty after normalization")]
    EmptyQuery,

    /// Caller passed an empty session id.
    #[error("session id must not be empty")]
    EmptySession,
}

pub type EngineResult<T> = Result<T, EngineError>;
