//! Error types for the Port catalog client.
//!
//! # Design
//! The catalog API signals failure through the `ok` flag of its response
//! envelope, so a 2xx status alone never means success. `RemoteRejection`
//! covers every response whose envelope says `ok: false`, regardless of the
//! HTTP status, and keeps the raw body for diagnostics. Transport-level
//! failures never carry a status because no response was received.

use thiserror::Error;

/// Errors returned by the transport, the request builder, and the mappers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, TLS).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The call context was cancelled or its deadline elapsed.
    #[error("request cancelled")]
    Cancelled,

    /// The response body is not JSON or does not match the expected shape.
    #[error("decoding response (HTTP {status}) failed: {message}")]
    Decode {
        status: u16,
        message: String,
        body: String,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response parsed, but its envelope reported `ok: false`.
    #[error("{operation} rejected by the catalog (HTTP {status}): {body}")]
    RemoteRejection {
        operation: &'static str,
        status: u16,
        message: Option<String>,
        body: String,
    },

    /// The request could not be built from the supplied arguments.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Client configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the response that produced this error, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Decode { status, .. } | ApiError::RemoteRejection { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// `true` when the catalog rejected the call with a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::RemoteRejection { status: 404, .. })
    }
}

impl From<::config::ConfigError> for ApiError {
    fn from(err: ::config::ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}
