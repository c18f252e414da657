//! Error taxonomy shared by the request client and the section controllers.

use thiserror::Error;

/// Failure of a backend call, classified by how the caller must react.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 401. Terminates the session.
    #[error("Session expired or invalid (HTTP 401)")]
    Unauthorized,
    /// HTTP 404. On a mutation the resource is treated as absent.
    #[error("Resource not found on server (HTTP 404)")]
    NotFound,
    /// HTTP 405. Only the delete fallbacks react to it.
    #[error("Method not allowed by server (HTTP 405)")]
    MethodNotAllowed,
    /// Connect, timeout or other transport failure.
    #[error("{0}")]
    Network(String),
    /// Any other non-success status.
    #[error("{message} (HTTP {status})")]
    Server { status: u16, message: String },
    /// A 2xx body that could not be decoded.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
    /// The local store failed.
    #[error("Local storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// True for failures that mean the backend could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Client-side validation failure. Never reaches the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
