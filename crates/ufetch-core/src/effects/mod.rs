//! I/O and the fetch lifecycle.
//!
//! The controller is a state machine driven by the loop in [`fetcher`]; the
//! network side sits behind the [`Exchange`] trait and the output side
//! behind [`SinkOpener`].

pub mod controller;
pub mod exchange;
pub mod fetcher;
#[cfg(feature = "reqwest")]
pub mod http;
pub mod sink;
pub mod tls;

pub use controller::{Flow, RequestController};
pub use exchange::Exchange;
pub use fetcher::{Fetcher, drive};
#[cfg(feature = "reqwest")]
pub use http::ReqwestExchange;
pub use sink::{FileOpener, SinkAdapter, SinkOpener};
pub use tls::{FailureLog, TlsProvider};
