//! Immutable data types for fetch operations.
//!
//! Requests, response metadata, lifecycle states and options. Nothing in
//! here performs I/O.

pub mod options;
pub mod request;
pub mod response;
pub mod state;

pub use options::{DEFAULT_MAX_REDIRECTS, FetchEvent, FetchOptions, Outcome};
pub use request::{Method, Request};
pub use response::ResponseMeta;
pub use state::ConnectionState;
