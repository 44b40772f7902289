//! Error types for the request executor.
//!
//! # Design
//! Every failure is classified into exactly one variant and surfaced
//! synchronously to the caller. Nothing is retried. Validation variants
//! (`UnknownMethod`, `MissingBody`, `InvalidHeader`) are always raised before
//! the engine is touched.

use thiserror::Error;

/// Errors returned by `RequestExecutor`.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The method token is not one of the seven recognized lowercase names.
    #[error("unknown http method {0}")]
    UnknownMethod(String),

    /// A POST request was issued without a body.
    #[error("data argument is required for POST requests")]
    MissingBody,

    /// A header entry was not a string. `value` is a printable rendering of
    /// the offending entry.
    #[error("bad header item at index {index}, expected string, got {value}")]
    InvalidHeader { index: usize, value: String },

    /// The engine could not allocate a session for `execute`.
    #[error("cannot get transfer session")]
    SessionUnavailable,

    /// The blocking transfer failed.
    #[error("{0}")]
    Transfer(String),

    /// The engine could not allocate a handle for `escape`/`unescape`.
    #[error("cannot get transfer handle")]
    HandleUnavailable,
}

/// Field-less discriminant of `RequestError`, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownMethod,
    MissingBody,
    InvalidHeader,
    SessionUnavailable,
    Transfer,
    HandleUnavailable,
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::UnknownMethod(_) => ErrorKind::UnknownMethod,
            RequestError::MissingBody => ErrorKind::MissingBody,
            RequestError::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            RequestError::SessionUnavailable => ErrorKind::SessionUnavailable,
            RequestError::Transfer(_) => ErrorKind::Transfer,
            RequestError::HandleUnavailable => ErrorKind::HandleUnavailable,
        }
    }
}
