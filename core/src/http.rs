//! Request and response descriptors.
//!
//! # Design
//! Both descriptors are plain owned data created fresh for every call. Header
//! lines travel as raw `"Name: value"` strings in both directions; this layer
//! never parses or validates them. Bodies are byte vectors so embedded NULs
//! survive the trip to and from the transfer engine.

use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;

/// HTTP method for a request.
///
/// Parsed from the canonical lowercase token (`"get"`, `"post"`, ...).
/// Matching is case-sensitive: `"GET"` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Options,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Options,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Options => "options",
            Method::Head => "head",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }
}

impl FromStr for Method {
    type Err = RequestError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == token)
            .ok_or_else(|| RequestError::UnknownMethod(token.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `body` is mandatory for `Method::Post` (checked by the executor before any
/// I/O). For every other method an absent body means no request body is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replace the outgoing header lines. Each entry is passed to the engine
    /// verbatim, in order.
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }
}

/// An HTTP response assembled from the engine's body and header callbacks.
///
/// `headers` holds the header lines in the order the engine delivered them,
/// right-trimmed, without the status line or blank separator lines.
/// `UreqEngine` delivers them in `http::HeaderMap` order: names are
/// lowercased and repeated names are grouped together, so a header that
/// arrived between two `set-cookie` lines is listed after both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub body: Vec<u8>,
    pub status_code: u16,
    pub headers: Vec<String>,
}

impl HttpResponse {
    /// The body as UTF-8, if it is valid UTF-8.
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Value of the first header line whose name matches `name`
    /// case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}
