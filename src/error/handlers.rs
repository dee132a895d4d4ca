//! Standardized mapping from Docker daemon HTTP failures to [`MoverError`]

use crate::error::MoverError;
use reqwest::StatusCode;
use serde::Deserialize;

/// Error body returned by the Docker Engine API
#[derive(Debug, Deserialize)]
struct DaemonErrorBody {
    message: String,
}

/// Standard error handler for daemon HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Pull the `message` field out of a daemon error body, falling back to
    /// the raw text when the body is not the usual JSON object.
    pub fn extract_message(body: &str) -> String {
        match serde_json::from_str::<DaemonErrorBody>(body) {
            Ok(parsed) => parsed.message,
            Err(_) => body.trim().to_string(),
        }
    }

    /// True when a daemon message reports rejected registry credentials
    pub fn is_credential_rejection(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("unauthorized")
            || lower.contains("incorrect username or password")
            || lower.contains("authentication required")
            || lower.contains("invalid username/password")
    }

    /// Handle a failed pull request before any progress was streamed
    pub fn handle_pull_error(status: StatusCode, message: &str, reference: &str) -> MoverError {
        match status.as_u16() {
            404 => MoverError::NotFound(format!("{}: {}", reference, message)),
            401 | 403 => MoverError::Authentication(format!(
                "Pull of {} was not authorized: {}",
                reference, message
            )),
            _ => Self::handle_daemon_error(status, message, &format!("pull of {}", reference)),
        }
    }

    /// Handle a failed push request before any progress was streamed
    pub fn handle_push_error(status: StatusCode, message: &str, reference: &str) -> MoverError {
        match status.as_u16() {
            401 | 403 => MoverError::Permission(format!(
                "Push of {} was refused: {}",
                reference, message
            )),
            404 => MoverError::NotFound(format!(
                "{} is not present in the local image store: {}",
                reference, message
            )),
            _ => Self::handle_daemon_error(status, message, &format!("push of {}", reference)),
        }
    }

    /// Generic daemon failure
    pub fn handle_daemon_error(status: StatusCode, message: &str, operation: &str) -> MoverError {
        let error_msg = match status.as_u16() {
            400 => format!("Bad request during {}: {}", operation, message),
            409 => format!("Conflict during {}: {}", operation, message),
            500 => format!("Daemon error during {}: {}", operation, message),
            502 | 503 => format!("Daemon unavailable during {}: {}", operation, message),
            _ => format!("{} failed (status {}): {}", operation, status, message),
        };

        MoverError::Transfer(error_msg)
    }
}
