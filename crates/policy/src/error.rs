use thiserror::Error;

/// Snapshot loading/serving failure.
///
/// `NotLoaded` is the system-level fail-closed state: the engine refuses to
/// evaluate anything until a valid snapshot is installed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyLoadError {
    #[error("malformed policy snapshot: {0}")]
    Malformed(String),

    #[error("invalid policy snapshot: {0}")]
    Invalid(String),

    #[error("no policy snapshot loaded")]
    NotLoaded,
}
