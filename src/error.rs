use thiserror::Error;

/// Failure kinds surfaced to callers. Extraction-internal parse failures are
/// swallowed where they occur and never reach this enum.
#[derive(Debug, Error)]
pub enum Error {
    #[error("job #{0} not found")]
    NotFound(i64),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
