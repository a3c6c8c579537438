//! Error types for client setup.
//!
//! Mutation failures are not errors in this sense: they come back as
//! [`crate::mutation::MutationOutcome::Failed`] so callers always get an outcome.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Telemetry setup failed: {0}")]
    Telemetry(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
