use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl InfraError {
    pub(crate) fn poisoned(what: &str, error: impl std::fmt::Display) -> Self {
        Self::Unavailable(format!("{what} lock poisoned: {error}"))
    }
}
