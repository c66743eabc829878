use std::path::PathBuf;

use thiserror::Error;

/// Contract violations of the session state machine, plus persistence
/// failures surfaced while a session step commits.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("a review session is already active")]
    AlreadyActive,

    #[error("no review session is active")]
    NoActiveSession,

    #[error("no card left in the due queue")]
    NoCurrentCard,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown card id: {0}")]
    UnknownCard(String),

    #[error("duplicate card id: {0}")]
    DuplicateCard(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
