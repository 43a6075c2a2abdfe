use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid numeric values")]
    InvalidNumber,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Object store error: {message}")]
    Store { message: String },
}

pub type Result<T> = std::result::Result<T, PortalError>;

/// Non-fatal failure of a secondary effect. The primary operation succeeded;
/// the store and the catalog may have drifted apart.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    BlobDeleteFailed { key: String, reason: String },
    DocumentLoadFailed { key: String, reason: String },
    SeedWriteFailed { key: String, reason: String },
    RegistryPullFailed { reason: String },
    ContactLogDropped { reason: String },
    CounterBumpFailed { key: String, reason: String },
}

/// Primary outcome plus the warnings accumulated along the way, so callers
/// and tests can observe best-effort failures instead of losing them in a
/// log line.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }
}
