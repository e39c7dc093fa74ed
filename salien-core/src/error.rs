//! Error types of the core crate
//!
//! Two families live here. Errors proper (`ApiError`, `SalienError`) travel
//! with `?` up to the session supervisor. Logical inconsistencies that only
//! mean "rebuild state and try again" are not errors: the round controller
//! reports them as [`crate::round::RoundOutcome::Restart`].

use crate::api::{EResult, Operation};

/// Error raised by a [`crate::api::Transport`] for a single attempt
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Why a single attempt of a remote call failed
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttemptFailure {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),
    #[error("rejected with {result}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Rejected {
        result: EResult,
        message: Option<String>,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors surfaced by the API layer
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to send {operation} after {attempts} attempts")]
    RequestExhausted {
        operation: Operation,
        attempts: u32,
        last_failure: AttemptFailure,
    },
}

impl ApiError {
    /// The token was refused; retrying or restarting cannot fix this
    pub fn is_fatal(&self) -> bool {
        match self {
            ApiError::RequestExhausted { last_failure, .. } => matches!(
                last_failure,
                AttemptFailure::Unauthorized(_)
                    | AttemptFailure::Rejected { result: EResult::ACCESS_DENIED, .. }
            ),
        }
    }
}

/// Errors that reach the session supervisor
#[derive(Debug, thiserror::Error)]
pub enum SalienError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl SalienError {
    pub fn is_fatal(&self) -> bool {
        match self {
            SalienError::Api(err) => err.is_fatal(),
            SalienError::Fatal(_) => true,
        }
    }
}

pub type Result<T, E = SalienError> = std::result::Result<T, E>;
