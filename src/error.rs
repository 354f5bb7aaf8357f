// Error taxonomy for the reconciliation engine.
//
// Row-level problems are never errors: adapters recover, log, and move on.
// These variants cover the failures that abort one institution's pipeline and
// get converted into structured outcomes at the orchestrator boundary.

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ReconError>;

#[derive(Debug, Error)]
pub enum ReconError {
    /// No adapter is registered for the requested institution code.
    #[error("institution '{0}' is not supported")]
    UnsupportedInstitution(String),

    /// The source handle yielded no sheets at all.
    #[error("source for institution '{0}' contains no sheets")]
    EmptySource(String),

    /// The underlying table handle could not be read.
    #[error("source read error: {0}")]
    SourceRead(String),

    /// Institution configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for ReconError {
    fn from(err: csv::Error) -> Self {
        ReconError::SourceRead(err.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        ReconError::SourceRead(err.to_string())
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(err: serde_json::Error) -> Self {
        ReconError::Config(err.to_string())
    }
}
