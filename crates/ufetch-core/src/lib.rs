//! Single-connection HTTP/HTTPS fetching with bounded redirects.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Requests, response metadata, states and options
//! - [`core`] - Pure decisions: redirect policy and error classification
//! - [`effects`] - The request controller, its event loop, sinks and transports
//!
//! # Key Features
//!
//! - **One Outcome**: every fetch ends in exactly one [`Outcome`], however many
//!   physical requests the redirect chain took
//! - **Lazy Sink**: the output is opened only for an accepted final response
//!   and closed exactly once
//! - **Classified Errors**: failures map onto a small [`ErrorKind`] taxonomy
//!   with stable exit codes
//! - **Optional TLS**: `https` needs a [`TlsProvider`]; without one the fetch
//!   is refused before connecting

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use crate::core::{ErrorClassifier, RedirectPolicy, is_redirect};
pub use data::{
    ConnectionState, DEFAULT_MAX_REDIRECTS, FetchEvent, FetchOptions, Method, Outcome, Request,
    ResponseMeta,
};
pub use effects::{
    Exchange, FailureLog, FileOpener, Fetcher, Flow, RequestController, SinkAdapter, SinkOpener,
    TlsProvider, drive,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestExchange;

pub use error::{ErrorKind, ErrorRecord, FetchError, Result, TransportError};
