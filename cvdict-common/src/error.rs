//! Error type shared by the cvdict crates

use thiserror::Error;

/// Result alias used by store, import and reconciliation code
pub type Result<T> = std::result::Result<T, Error>;

/// Store, configuration and input errors
///
/// Enrichment failures have their own type and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// Primary or Source Store query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File access (stores, CC-CEDICT file, seed files, reports)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad TOML file or missing credential
    #[error("Config error: {0}")]
    Config(String),

    /// Requested resource not found (missing store file, unknown entry)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input file
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dictionary download failure
    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
