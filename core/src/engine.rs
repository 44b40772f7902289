//! Transfer-engine seam.
//!
//! # Design
//! The executor never performs network I/O itself. It drives an `Engine`,
//! which hands out single-use `Session`s. A session is configured, performed
//! once, read back, and dropped; dropping it releases the session together
//! with every header line registered on it, so teardown happens on every exit
//! path without explicit cleanup calls.
//!
//! Response data flows back through a `TransferSink` the executor passes to
//! `perform`, instead of raw callback/userdata pairs.

use std::sync::Arc;

use crate::http::Method;

/// Receives response data from a running transfer.
///
/// Both callbacks return the number of bytes consumed. Returning anything
/// other than the delivered length tells the engine to abort the transfer.
pub trait TransferSink {
    /// One chunk of response body. Chunk size and count are chosen by the
    /// engine.
    fn on_body_chunk(&mut self, chunk: &[u8]) -> usize;

    /// One raw header line as received, including the status line, the
    /// trailing CR-LF, and the blank line that ends the header block.
    fn on_header_line(&mut self, line: &[u8]) -> usize;
}

/// Why a transfer failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    /// Generic description of the failure class.
    pub description: String,
    /// Detailed engine message; may be empty.
    pub detail: String,
}

impl TransferFailure {
    pub fn new(description: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            detail: detail.into(),
        }
    }

    /// The detailed message when there is one, else the generic description.
    pub fn message(&self) -> &str {
        if self.detail.is_empty() {
            &self.description
        } else {
            &self.detail
        }
    }
}

/// One configured, single-use exchange with the transfer engine.
pub trait Session {
    fn set_url(&mut self, url: &str);

    fn set_method(&mut self, method: Method);

    /// Request body with an explicit length. May contain NUL bytes.
    fn set_body(&mut self, body: &[u8]);

    /// Register one raw outgoing header line. Lines are sent in registration
    /// order and released when the session is dropped.
    fn append_header(&mut self, line: &str);

    /// Run the blocking transfer, delivering response data to `sink`.
    fn perform(&mut self, sink: &mut dyn TransferSink) -> Result<(), TransferFailure>;

    /// Final status code of the last `perform`.
    fn status_code(&self) -> u16;

    /// Percent-encode `input` with the engine's escaping rules.
    fn escape(&self, input: &[u8]) -> String;

    /// Percent-decode `input`. The result may contain NUL bytes.
    fn unescape(&self, input: &[u8]) -> Vec<u8>;
}

/// Process-wide transfer engine. Built once and shared by every executor.
pub trait Engine: Send + Sync {
    type Session: Session;

    /// Allocate a fresh session, or `None` when the engine cannot.
    fn open_session(&self) -> Option<Self::Session>;
}

impl<E: Engine + ?Sized> Engine for &E {
    type Session = E::Session;

    fn open_session(&self) -> Option<Self::Session> {
        (**self).open_session()
    }
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    type Session = E::Session;

    fn open_session(&self) -> Option<Self::Session> {
        (**self).open_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_detail() {
        let failure = TransferFailure::new("Couldn't connect to server", "connection refused");
        assert_eq!(failure.message(), "connection refused");
    }

    #[test]
    fn failure_message_falls_back_to_description() {
        let failure = TransferFailure::new("Couldn't connect to server", "");
        assert_eq!(failure.message(), "Couldn't connect to server");
    }
}
