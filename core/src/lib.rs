//! Minimal blocking HTTP client core for host-language bindings.
//!
//! # Overview
//! A caller builds an `HttpRequest`, hands it to a `RequestExecutor`, and
//! receives an `HttpResponse` carrying the body bytes, the final status code,
//! and the received header lines. Network I/O is delegated to an injected
//! `Engine`; `UreqEngine` is the production one.
//!
//! # Design
//! - One fresh engine session per call; no state is shared between calls.
//! - Validation (method token, POST body) happens before any I/O.
//! - Every failure is a classified `RequestError`; nothing is retried.
//! - `escape`/`unescape` percent-encode with `urlencoding`, which matches
//!   curl's rules: only `A-Z a-z 0-9 - . _ ~` pass through unencoded.

pub mod engine;
pub mod error;
pub mod executor;
pub mod http;
pub mod ureq_engine;

pub use engine::{Engine, Session, TransferFailure, TransferSink};
pub use error::{ErrorKind, RequestError};
pub use executor::{RequestExecutor, ResponseCollector};
pub use http::{HttpRequest, HttpResponse, Method};
pub use ureq_engine::{EngineConfig, UreqEngine, UreqSession};
