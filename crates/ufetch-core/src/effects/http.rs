use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use bytes::Bytes;
use tracing::debug;
use url::Host;

use crate::data::{FetchOptions, Request, ResponseMeta};
use crate::effects::exchange::Exchange;
use crate::effects::tls::{FailureLog, TlsProvider};
use crate::error::{FetchError, Result, TransportError};

type PendingResponse = Pin<Box<dyn Future<Output = reqwest::Result<reqwest::Response>> + Send>>;

/// Production [`Exchange`] using `reqwest`.
///
/// Automatic redirect handling is turned off; relocation is the redirect
/// policy's job. When built with a [`TlsProvider`], certificate checks run
/// through the provider's recording verifier.
pub struct ReqwestExchange {
    client: reqwest::Client,
    tls: bool,
    failures: FailureLog,
    pending: Option<PendingResponse>,
    response: Option<reqwest::Response>,
}

impl ReqwestExchange {
    /// Build the client.
    ///
    /// `tls` of `None` leaves the exchange unable to serve `https` targets.
    pub fn new(tls: Option<TlsProvider>, options: &FetchOptions) -> Result<Self> {
        let failures = FailureLog::default();
        let builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(options.user_agent.clone());

        let has_tls = tls.is_some();
        let builder = match tls {
            Some(provider) => {
                provider.configure(builder, options.verify_certificates, failures.clone())?
            }
            None => builder,
        };

        let client = builder.build().map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            tls: has_tls,
            failures,
            pending: None,
            response: None,
        })
    }

    async fn resolve(request: &Request) -> std::result::Result<Option<SocketAddr>, TransportError> {
        let port = request.port();
        match request.url().host() {
            Some(Host::Ipv4(ip)) => Ok(Some(SocketAddr::new(ip.into(), port))),
            Some(Host::Ipv6(ip)) => Ok(Some(SocketAddr::new(ip.into(), port))),
            Some(Host::Domain(domain)) => {
                let mut addrs = tokio::net::lookup_host((domain, port))
                    .await
                    .map_err(|e| TransportError::Connect(format!("{domain}: {e}")))?;
                match addrs.next() {
                    Some(addr) => Ok(Some(addr)),
                    None => Err(TransportError::Connect(format!("{domain}: no addresses found"))),
                }
            }
            None => Err(TransportError::Connect(format!("{}: missing host", request.url()))),
        }
    }
}

impl Exchange for ReqwestExchange {
    fn supports_tls(&self) -> bool {
        self.tls
    }

    async fn connect(
        &mut self,
        request: &Request,
    ) -> std::result::Result<Option<SocketAddr>, TransportError> {
        self.disconnect();
        if request.is_secure() && !self.tls {
            return Err(TransportError::TlsUnavailable(request.url().to_string()));
        }
        let addr = Self::resolve(request).await?;
        debug!(host = request.host(), ?addr, "resolved");
        Ok(addr)
    }

    fn send(&mut self, request: &Request) -> std::result::Result<(), TransportError> {
        let pending = self.client.get(request.url().clone()).send();
        self.pending = Some(Box::pin(pending));
        Ok(())
    }

    async fn head(&mut self) -> std::result::Result<ResponseMeta, TransportError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| TransportError::Protocol("no request in flight".to_string()))?;
        let response = pending.await?;
        let meta = ResponseMeta::from(&response);
        debug!(status = meta.status, remote = ?response.remote_addr(), "response headers");
        self.response = Some(response);
        Ok(meta)
    }

    async fn read(&mut self) -> std::result::Result<Option<Bytes>, TransportError> {
        match self.response.as_mut() {
            Some(response) => Ok(response.chunk().await?),
            None => Ok(None),
        }
    }

    fn verification_failures(&mut self) -> Vec<TransportError> {
        self.failures.drain()
    }

    fn disconnect(&mut self) {
        self.pending = None;
        self.response = None;
    }
}
