//! Error types for mfapi-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MfError {
    /// A required argument (server, user, URL, message) was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Hostname resolution failed: {0}")]
    HostnameResolution(String),

    /// The request could not be completed at all.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No active session; call new_session first")]
    NoSession,

    #[error("Server returned an empty experiment id")]
    EmptyExperimentId,

    #[error("Failed to start I/O runtime: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MfError {
    /// True for failures that happened before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, MfError::InvalidArgument(_) | MfError::NoSession)
    }
}

pub type Result<T> = std::result::Result<T, MfError>;
