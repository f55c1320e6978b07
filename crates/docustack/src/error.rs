use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocustackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("No platform config directory available")]
    NoConfigDir,
}

/// Failures of the read-and-extract step of a job.
///
/// The `Display` output is what ends up in the job's error message, so
/// `Service` carries the collaborator's message unchanged.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read '{name}': {source}")]
    ReadFile {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction request failed: {0}")]
    Request(String),

    #[error("Extraction service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Service(String),

    #[error("No API key configured for the extraction service")]
    MissingApiKey,
}

impl ExtractionError {
    /// Wraps a human-readable failure message from the extraction service.
    pub fn service(message: impl Into<String>) -> Self {
        ExtractionError::Service(message.into())
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractionError::Request(format!("request timed out: {}", err))
        } else {
            ExtractionError::Request(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DocustackError>;
