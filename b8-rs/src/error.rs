use thiserror::Error;

#[derive(Error, Debug)]
pub enum B8Error {
    #[error("Text is missing or empty")]
    TextMissing,

    #[error("Invalid category: {0} (expected \"probable\" or \"improbable\")")]
    InvalidCategory(String),

    #[error("Invalid context name: {0:?}")]
    InvalidContext(String),

    #[error("Unknown configuration key: \"{0}\"")]
    UnknownConfigKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database schema version {found} does not match expected version {expected}")]
    SchemaVersion { found: i64, expected: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, B8Error>;
