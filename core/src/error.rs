//! Error types for the todo session client.
//!
//! # Design
//! Two layers. `ApiError` describes what went wrong on the wire: a status
//! the parser did not expect, a body it could not read, or a transport that
//! never produced a response. `Error` is what session and list operations
//! return to callers; it wraps `ApiError` together with a static context
//! string, and keeps local precondition failures (`NotFound`, `InvalidInput`)
//! apart from remote ones so callers can tell "never sent" from "sent and
//! rejected".
//!
//! A malformed credential is not an error at all: `token::decode` returns
//! `None` for it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::TodoId;

/// Wire-level failures produced by transports and `parse_*` methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404 for the requested resource.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the request's credentials (401).
    #[error("request was not authorized")]
    Unauthorized,

    /// The server returned any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Failures of the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read credential from {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write credential to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to remove credential at {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A success response lacked the expected token or payload.
    MissingCredential,
    /// A local lookup by id failed; no request was sent.
    NotFound,
    /// Input was rejected locally; no request was sent.
    InvalidInput,
    /// The request was sent and did not succeed.
    Transport,
    /// The local credential store failed.
    Store,
}

/// Errors returned by `SessionGuard` and `TodoList` operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("response was missing required data {context}")]
    MissingCredential { context: &'static str },

    #[error("no todo with id {0} in the current list")]
    NotFound(TodoId),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("{source} {context}")]
    Transport {
        context: &'static str,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn transport(context: &'static str, source: ApiError) -> Self {
        Error::Transport { context, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingCredential { .. } => ErrorKind::MissingCredential,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Store(_) => ErrorKind::Store,
        }
    }

    /// True when the server rejected the session's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::Transport {
                source: ApiError::Unauthorized,
                ..
            }
        )
    }

    /// True when the failure happened before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_appends_context() {
        let err = Error::transport("deleting todo item.", ApiError::NotFound);
        assert_eq!(err.to_string(), "resource not found deleting todo item.");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.is_local());
    }

    #[test]
    fn local_failures_are_flagged() {
        assert!(Error::NotFound(TodoId::from(3)).is_local());
        assert!(Error::InvalidInput("title must not be empty").is_local());
    }

    #[test]
    fn unauthorized_is_detectable() {
        let err = Error::transport("getting todo list.", ApiError::Unauthorized);
        assert!(err.is_unauthorized());
        let err = Error::transport("getting todo list.", ApiError::NotFound);
        assert!(!err.is_unauthorized());
    }
}
