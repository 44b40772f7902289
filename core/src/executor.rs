//! Synchronous request executor.
//!
//! # Design
//! `RequestExecutor` holds only an engine handle and carries no state between
//! calls. Each `execute` validates the request, opens one fresh session,
//! configures it, performs the transfer into a `ResponseCollector`, and drops
//! the session before returning. Because nothing is shared between calls,
//! executors can be used from many threads at once without locking.

use tracing::{debug, warn};

use crate::engine::{Engine, Session, TransferSink};
use crate::error::RequestError;
use crate::http::{HttpRequest, HttpResponse, Method};

/// Accumulates body chunks and header lines delivered by the engine.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    body: Vec<u8>,
    headers: Vec<String>,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn into_response(self, status_code: u16) -> HttpResponse {
        HttpResponse {
            body: self.body,
            status_code,
            headers: self.headers,
        }
    }
}

impl TransferSink for ResponseCollector {
    fn on_body_chunk(&mut self, chunk: &[u8]) -> usize {
        self.body.extend_from_slice(chunk);
        chunk.len()
    }

    fn on_header_line(&mut self, line: &[u8]) -> usize {
        if matches!(line.first(), Some(b'\r' | b'\n')) || line.starts_with(b"HTTP/") {
            return line.len();
        }
        let trimmed = line.trim_ascii_end();
        if !trimmed.is_empty() {
            self.headers.push(String::from_utf8_lossy(trimmed).into_owned());
        }
        line.len()
    }
}

/// Executes `HttpRequest`s against an injected `Engine`.
#[derive(Debug, Clone)]
pub struct RequestExecutor<E> {
    engine: E,
}

impl<E: Engine> RequestExecutor<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Parse `method` and run the request. This is the host-facing entry
    /// point: `method` is a lowercase token such as `"get"`.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        body: Option<Vec<u8>>,
        headers: Vec<String>,
    ) -> Result<HttpResponse, RequestError> {
        let method: Method = method.parse()?;
        self.execute(HttpRequest {
            method,
            url: url.to_string(),
            body,
            headers,
        })
    }

    /// Perform one blocking request.
    ///
    /// Validation failures are returned before a session is opened. On a
    /// transfer failure the partially collected body and headers are
    /// discarded.
    pub fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let HttpRequest {
            method,
            url,
            body,
            headers,
        } = request;

        if method == Method::Post && body.is_none() {
            return Err(RequestError::MissingBody);
        }

        let mut session = self
            .engine
            .open_session()
            .ok_or(RequestError::SessionUnavailable)?;

        session.set_url(&url);
        session.set_method(method);
        if let Some(body) = &body {
            session.set_body(body);
        }
        for line in &headers {
            session.append_header(line);
        }

        debug!(%method, %url, headers = headers.len(), "performing transfer");

        let mut collector = ResponseCollector::new();
        if let Err(failure) = session.perform(&mut collector) {
            warn!(%method, %url, error = failure.message(), "transfer failed");
            return Err(RequestError::Transfer(failure.message().to_string()));
        }

        let status_code = session.status_code();
        debug!(%method, %url, status_code, bytes = collector.body().len(), "transfer complete");
        Ok(collector.into_response(status_code))
    }

    /// Percent-encode `input` using the engine's escaping rules.
    pub fn escape(&self, input: &[u8]) -> Result<String, RequestError> {
        let handle = self
            .engine
            .open_session()
            .ok_or(RequestError::HandleUnavailable)?;
        Ok(handle.escape(input))
    }

    /// Percent-decode `input`. The decoded bytes may contain NULs.
    pub fn unescape(&self, input: &[u8]) -> Result<Vec<u8>, RequestError> {
        let handle = self
            .engine
            .open_session()
            .ok_or(RequestError::HandleUnavailable)?;
        Ok(handle.unescape(input))
    }
}
