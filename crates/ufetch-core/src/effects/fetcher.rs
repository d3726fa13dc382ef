use tracing::debug;

use crate::data::{FetchOptions, Outcome, Request};
use crate::effects::controller::{Flow, RequestController};
use crate::effects::exchange::Exchange;
use crate::effects::sink::SinkOpener;
use crate::error::{ErrorKind, FetchError, Result};

/// Runs fetches over an [`Exchange`].
///
/// Each call to [`Fetcher::fetch`] gets its own controller, so redirect
/// counting starts from zero for every fetch.
pub struct Fetcher<E: Exchange> {
    exchange: E,
    options: FetchOptions,
}

impl<E: Exchange> Fetcher<E> {
    pub fn new(exchange: E, options: FetchOptions) -> Self {
        Self { exchange, options }
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn into_exchange(self) -> E {
        self.exchange
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch `url` into whatever `opener` provides.
    ///
    /// # Errors
    ///
    /// Only configuration problems are errors: an unparsable URL, an
    /// unsupported scheme, or an `https` URL without TLS support. Everything
    /// that goes wrong once the fetch is under way is reported through the
    /// returned [`Outcome`].
    pub async fn fetch<O: SinkOpener>(&mut self, url: &str, opener: O) -> Result<Outcome> {
        let request = Request::get(url)?;
        self.fetch_request(request, opener).await
    }

    pub async fn fetch_request<O: SinkOpener>(
        &mut self,
        request: Request,
        opener: O,
    ) -> Result<Outcome> {
        if request.is_secure() && !self.exchange.supports_tls() {
            return Err(FetchError::TlsUnavailable);
        }
        let mut controller = RequestController::new(request, opener, self.options.clone());
        Ok(drive(&mut self.exchange, &mut controller).await)
    }
}

/// Event loop for a single fetch.
///
/// Performs what each [`Flow`] asks for and hands the result back to the
/// controller until it reports a terminal outcome. A step that fails ends
/// the fetch; it is never retried. Callbacks run one at a
/// time; a redirect's new physical request only begins after the previous
/// one has been handed off.
pub async fn drive<E, O>(exchange: &mut E, controller: &mut RequestController<O>) -> Outcome
where
    E: Exchange,
    O: SinkOpener,
{
    let mut flow = controller.start();
    loop {
        flow = match flow {
            Flow::Connect => match exchange.connect(controller.request()).await {
                Ok(addr) => controller.on_connected(addr),
                Err(e) => controller.on_step_error(e),
            },
            Flow::Send => match exchange.send(controller.request()) {
                Ok(()) => controller.on_request_sent(),
                Err(e) => controller.on_step_error(e),
            },
            Flow::AwaitHeaders => {
                let head = exchange.head().await;
                let mut next = Flow::AwaitHeaders;
                for failure in exchange.verification_failures() {
                    next = controller.on_error(failure);
                    if next.is_terminal() {
                        break;
                    }
                }
                if next.is_terminal() {
                    next
                } else {
                    match head {
                        Ok(meta) => controller.on_headers(meta),
                        Err(e) => controller.on_step_error(e),
                    }
                }
            }
            Flow::Read => match exchange.read().await {
                Ok(Some(chunk)) => controller.on_data(&chunk),
                Ok(None) => controller.on_end(),
                Err(e) => controller.on_step_error(e),
            },
            Flow::Finished(outcome) => {
                exchange.disconnect();
                debug!(%outcome, requests = controller.physical_requests(), "fetch finished");
                return outcome;
            }
            Flow::Closed => {
                exchange.disconnect();
                return controller.outcome().unwrap_or(Outcome::Failure(ErrorKind::Unknown));
            }
        };
    }
}
