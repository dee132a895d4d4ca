//! Error types for the image mover
//!
//! Every failure of a run maps onto one [`MoverError`] variant, and every
//! variant maps onto its own process exit code.

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoverError>;

#[derive(Error, Debug)]
pub enum MoverError {
    /// Missing or invalid connection, certificate or transfer settings
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Docker daemon could not be reached
    #[error("Connection error: {0}")]
    Connection(String),
    /// Registry rejected the credentials
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// Source image or tag does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Local retagging failed
    #[error("Tag error: {0}")]
    Tag(String),
    /// Pull or push stream reported a failure or ended early
    #[error("Transfer error: {0}")]
    Transfer(String),
    /// Destination registry refused the push
    #[error("Permission error: {0}")]
    Permission(String),
}

impl MoverError {
    /// Process exit code for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            MoverError::Configuration(_) => 3,
            MoverError::Connection(_) => 4,
            MoverError::Authentication(_) => 5,
            MoverError::NotFound(_) => 6,
            MoverError::Tag(_) => 7,
            MoverError::Transfer(_) => 8,
            MoverError::Permission(_) => 9,
        }
    }
}

impl From<reqwest::Error> for MoverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            MoverError::Connection(err.to_string())
        } else if err.is_builder() {
            MoverError::Configuration(err.to_string())
        } else {
            MoverError::Transfer(err.to_string())
        }
    }
}

impl From<url::ParseError> for MoverError {
    fn from(err: url::ParseError) -> Self {
        MoverError::Configuration(format!("Invalid daemon address: {}", err))
    }
}
