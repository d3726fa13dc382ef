use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::data::{Request, ResponseMeta};
use crate::error::TransportError;

/// Transport plus HTTP framing for one physical request at a time.
///
/// The fetch loop calls these in order for every physical request:
/// `connect`, `send`, `head`, then `read` until it yields `None`. Redirects
/// start over at `connect` with the rewritten request. An `Err` from any of
/// these steps ends the fetch with that error's kind; certificate problems
/// the handshake tolerated go through `verification_failures` instead.
///
/// # Implementations
///
/// - [`ReqwestExchange`](crate::ReqwestExchange): production implementation using `reqwest`
/// - Scripted implementations for testing
pub trait Exchange {
    /// Whether `https` targets can be served at all.
    fn supports_tls(&self) -> bool;

    /// Establish (or resolve) the connection for `request`.
    ///
    /// Returns the remote address when known. Any response still held from
    /// a previous physical request is dropped.
    fn connect(
        &mut self,
        request: &Request,
    ) -> impl Future<Output = Result<Option<SocketAddr>, TransportError>> + Send;

    /// Stage `request` for sending.
    fn send(&mut self, request: &Request) -> Result<(), TransportError>;

    /// Wait for the status line and all headers of the staged request.
    fn head(&mut self) -> impl Future<Output = Result<ResponseMeta, TransportError>> + Send;

    /// Next chunk of the body, or `None` once the body is complete.
    fn read(&mut self) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;

    /// Certificate problems seen since the last call.
    ///
    /// These are reported even when the handshake was allowed to proceed,
    /// so the caller decides whether they are fatal.
    fn verification_failures(&mut self) -> Vec<TransportError>;

    /// Drop the current connection state.
    fn disconnect(&mut self);
}
