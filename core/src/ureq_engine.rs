//! Production transfer engine backed by `ureq`.
//!
//! # Design
//! Every session builds its own `ureq::Agent` with idle pooling switched off,
//! so no connection or cookie state survives a call. Status codes are
//! reported as data (`http_status_as_error(false)`) and no timeouts are set
//! beyond ureq's defaults. Redirects follow ureq's default policy.
//! Request bodies go out on POST, PUT and PATCH only; ureq refuses a body on
//! the other methods, so one supplied there is dropped with a warning.
//!
//! Response head is replayed to the sink as raw lines (status line, one line
//! per header, blank terminator) so the executor sees the same shape whatever
//! engine sits underneath. Header order follows `http::HeaderMap` iteration,
//! which groups repeated names together.

use std::io::Read;
use std::sync::OnceLock;

use tracing::{info, warn};
use ureq::{Agent, RequestBuilder};

use crate::engine::{Engine, Session, TransferFailure, TransferSink};
use crate::http::Method;

pub const DEFAULT_USER_AGENT: &str = "jequests (https://github.com/pingiun/jequests)";

const READ_CHUNK: usize = 16 * 1024;

/// Engine-wide settings applied to every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults, with `JEQUESTS_USER_AGENT` overriding the user agent.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(user_agent) = std::env::var("JEQUESTS_USER_AGENT") {
            if !user_agent.is_empty() {
                config.user_agent = user_agent;
            }
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct UreqEngine {
    config: EngineConfig,
}

impl UreqEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The process-wide engine, built from the environment on first use.
    /// Concurrent first calls still initialize it exactly once.
    pub fn global() -> &'static UreqEngine {
        static GLOBAL: OnceLock<UreqEngine> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = EngineConfig::from_env();
            info!(user_agent = %config.user_agent, "transfer engine initialized");
            UreqEngine::new(config)
        })
    }
}

impl Default for UreqEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine for UreqEngine {
    type Session = UreqSession;

    fn open_session(&self) -> Option<UreqSession> {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(0)
            .max_idle_connections_per_host(0)
            .user_agent(self.config.user_agent.clone())
            .build()
            .new_agent();

        Some(UreqSession {
            agent,
            url: String::new(),
            method: Method::Get,
            body: None,
            headers: Vec::new(),
            status_code: 0,
        })
    }
}

/// One `ureq` exchange. Configuration is buffered until `perform`.
pub struct UreqSession {
    agent: Agent,
    url: String,
    method: Method,
    body: Option<Vec<u8>>,
    headers: Vec<String>,
    status_code: u16,
}

impl Session for UreqSession {
    fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    fn set_body(&mut self, body: &[u8]) {
        self.body = Some(body.to_vec());
    }

    fn append_header(&mut self, line: &str) {
        self.headers.push(line.to_string());
    }

    fn perform(&mut self, sink: &mut dyn TransferSink) -> Result<(), TransferFailure> {
        let url = self.url.as_str();
        let body = self.body.take();
        let result = match self.method {
            Method::Post | Method::Put | Method::Patch => {
                let builder = match self.method {
                    Method::Post => self.agent.post(url),
                    Method::Put => self.agent.put(url),
                    _ => self.agent.patch(url),
                };
                let builder = apply_headers(builder, &self.headers);
                match body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
            Method::Get | Method::Head | Method::Options | Method::Delete => {
                if body.is_some() {
                    warn!(method = %self.method, "request body not sent for this method");
                }
                let builder = match self.method {
                    Method::Get => self.agent.get(url),
                    Method::Head => self.agent.head(url),
                    Method::Options => self.agent.options(url),
                    _ => self.agent.delete(url),
                };
                apply_headers(builder, &self.headers).call()
            }
        };
        let mut response = result.map_err(transfer_failure)?;

        self.status_code = response.status().as_u16();

        let status_line = format!("{:?} {}\r\n", response.version(), response.status());
        deliver_header(sink, status_line.as_bytes())?;
        for (name, value) in response.headers() {
            let line = format!(
                "{}: {}\r\n",
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes())
            );
            deliver_header(sink, line.as_bytes())?;
        }
        deliver_header(sink, b"\r\n")?;

        let mut reader = response.body_mut().as_reader();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buf).map_err(|e| {
                TransferFailure::new("Failure when receiving data from the peer", e.to_string())
            })?;
            if n == 0 {
                break;
            }
            if sink.on_body_chunk(&buf[..n]) != n {
                return Err(TransferFailure::new(
                    "Failed writing received data to disk/application",
                    "",
                ));
            }
        }
        Ok(())
    }

    fn status_code(&self) -> u16 {
        self.status_code
    }

    fn escape(&self, input: &[u8]) -> String {
        urlencoding::encode_binary(input).into_owned()
    }

    fn unescape(&self, input: &[u8]) -> Vec<u8> {
        urlencoding::decode_binary(input).into_owned()
    }
}

fn apply_headers<B>(mut builder: RequestBuilder<B>, headers: &[String]) -> RequestBuilder<B> {
    for line in headers {
        match split_header_line(line) {
            Some((name, value)) => builder = builder.header(name, value),
            None => warn!(%line, "dropping header line without a colon"),
        }
    }
    builder
}

/// Split a raw `"Name: value"` line. Lines without a colon have no name and
/// are not sent.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

fn deliver_header(sink: &mut dyn TransferSink, line: &[u8]) -> Result<(), TransferFailure> {
    if sink.on_header_line(line) != line.len() {
        return Err(TransferFailure::new("Failed writing header", ""));
    }
    Ok(())
}

fn transfer_failure(err: ureq::Error) -> TransferFailure {
    let description = match &err {
        ureq::Error::HostNotFound => "Couldn't resolve host name",
        ureq::Error::ConnectionFailed => "Couldn't connect to server",
        ureq::Error::Timeout(_) => "Timeout was reached",
        ureq::Error::BadUri(_) => "URL using bad/illegal format or missing URL",
        ureq::Error::Http(_) => "Malformed request",
        ureq::Error::TooManyRedirects => "Number of redirects hit maximum amount",
        ureq::Error::Io(_) => "Failure when receiving data from the peer",
        _ => "Transfer failed",
    };
    TransferFailure::new(description, err.to_string())
}
