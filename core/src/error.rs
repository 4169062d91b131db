//! Error types for the catalog client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because the detail route must report
//! a missing record with its own status, never as a transport failure.
//! Non-2xx responses land in `HttpError` with the raw status code and body
//! for logging; network-level failures observed by the caller go in
//! `Transport`. Query-level errors reported inside a 200 GraphQL payload keep
//! the upstream's own message in `Query`.

use std::fmt;

/// Result of every upstream-facing operation. There are no partial
/// successes: a value is either fully normalized or the call failed.
pub type Outcome<T> = Result<T, ApiError>;

/// Fixed message for a detail lookup the upstream does not know.
pub const NOT_FOUND_MESSAGE: &str = "Pokemon not found";

/// Fallback when the upstream signals a query error without a message.
pub const UNKNOWN_QUERY_ERROR: &str = "Unknown error from PokeAPI";

/// Errors returned by `CatalogClient` build and parse methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The upstream returned 404 for a detail lookup.
    NotFound,

    /// The upstream returned a non-2xx status other than a detail 404.
    HttpError { status: u16, body: String },

    /// The request never produced a response (connect error, timeout).
    Transport(String),

    /// The upstream answered but reported a query-level error.
    Query(String),

    /// The response body could not be deserialized into the expected shape.
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    SerializationError(String),

    /// An inbound parameter was rejected before any upstream call.
    InvalidParameter(String),
}

impl ApiError {
    /// Whether the failure belongs to the upstream (gateway) class rather
    /// than to the caller's input or a missing record.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            ApiError::HttpError { .. }
                | ApiError::Transport(_)
                | ApiError::Query(_)
                | ApiError::DeserializationError(_)
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "{NOT_FOUND_MESSAGE}"),
            ApiError::HttpError { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            ApiError::Transport(msg) => write!(f, "transport failed: {msg}"),
            ApiError::Query(msg) => write!(f, "{msg}"),
            ApiError::DeserializationError(msg) => {
                write!(f, "deserialization failed: {msg}")
            }
            ApiError::SerializationError(msg) => {
                write!(f, "serialization failed: {msg}")
            }
            ApiError::InvalidParameter(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
