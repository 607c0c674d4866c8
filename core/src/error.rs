//! Error types for the registrar client.
//!
//! # Design
//! The variants follow the failure taxonomy callers need to branch on:
//! no response at all (`Transport`, `DeadlineExceeded`), a response that is
//! not JSON (`Decode`), a decoded response with status >= 400 (`Api`), and
//! bad local input caught before any network activity (`Config`).

use serde_json::Value;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `WebglobeClient` operations and payload builders.
#[derive(Debug, Error)]
pub enum Error {
    /// The exchange could not be completed (DNS, connect, TLS, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The connect or total timeout elapsed before a response arrived.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The response body is not valid JSON.
    #[error("JSON decode error: {message}. Response: {body}")]
    Decode { message: String, body: String },

    /// The service answered with HTTP status >= 400.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<Value>,
        message: String,
    },

    /// Invalid local configuration or builder input.
    #[error("configuration error: {0}")]
    Config(String),

    /// A success response is missing fields the client depends on.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// HTTP status carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine error code extracted from an `Api` error body, if any.
    pub fn code(&self) -> Option<&Value> {
        match self {
            Error::Api { code, .. } => code.as_ref(),
            _ => None,
        }
    }

    pub fn is_api_error(&self) -> bool {
        matches!(self, Error::Api { .. })
    }
}
