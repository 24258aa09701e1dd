use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the failures callers are expected to show to a requester
    /// (missing subject, wrong role, missing team/department assignment).
    pub fn is_outward(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Forbidden(_) | Error::PreconditionFailed(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(e: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(e.to_string())
    }
}

// Closures run on the SQLite thread return our own error type; unwrap it so
// NotFound/Forbidden survive the trip back.
impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(e: tokio_rusqlite::Error<Error>) -> Self {
        match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => Error::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
