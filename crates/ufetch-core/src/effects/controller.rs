//! Lifecycle of one logical fetch.
//!
//! The controller does no I/O of its own besides writing to the sink. The
//! event loop performs whatever the returned [`Flow`] asks for and feeds the
//! result back through the matching `on_*` method.

use std::net::SocketAddr;

use tracing::{debug, warn};

use crate::core::{ErrorClassifier, RedirectPolicy};
use crate::data::{ConnectionState, FetchEvent, FetchOptions, Outcome, Request, ResponseMeta};
use crate::effects::sink::{SinkAdapter, SinkOpener};
use crate::error::{ErrorKind, TransportError};

/// What the event loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Establish a connection to the current target.
    Connect,
    /// Issue the request on the established connection.
    Send,
    /// Wait for status line and headers.
    AwaitHeaders,
    /// Read the next body chunk.
    Read,
    /// The fetch just ended. Reported exactly once.
    Finished(Outcome),
    /// The fetch ended earlier; nothing left to do.
    Closed,
}

impl Flow {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Flow::Finished(_) | Flow::Closed)
    }
}

pub struct RequestController<O: SinkOpener> {
    request: Request,
    state: ConnectionState,
    redirects: RedirectPolicy,
    classifier: ErrorClassifier,
    sink: SinkAdapter<O>,
    options: FetchOptions,
    response: Option<ResponseMeta>,
    outcome: Option<Outcome>,
    physical_requests: u32,
}

impl<O: SinkOpener> RequestController<O> {
    pub fn new(request: Request, opener: O, options: FetchOptions) -> Self {
        Self {
            request,
            state: ConnectionState::Idle,
            redirects: RedirectPolicy::new(options.max_redirects),
            classifier: ErrorClassifier::new(options.verify_certificates),
            sink: SinkAdapter::new(opener),
            options,
            response: None,
            outcome: None,
            physical_requests: 0,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Metadata of the final response, once it has arrived.
    pub fn response(&self) -> Option<&ResponseMeta> {
        self.response.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn redirects_taken(&self) -> u32 {
        self.redirects.taken()
    }

    /// Requests actually put on the wire, redirects included.
    pub fn physical_requests(&self) -> u32 {
        self.physical_requests
    }

    pub fn sink(&self) -> &SinkAdapter<O> {
        &self.sink
    }

    /// Begin the fetch.
    pub fn start(&mut self) -> Flow {
        if self.state != ConnectionState::Idle {
            return self.resume();
        }
        debug!(url = %self.request.url(), "starting fetch");
        self.transition(ConnectionState::Connecting);
        Flow::Connect
    }

    /// The transport reached the remote end.
    pub fn on_connected(&mut self, addr: Option<SocketAddr>) -> Flow {
        if self.state != ConnectionState::Connecting {
            return self.stray("connected");
        }
        self.options.emit(FetchEvent::Connecting {
            host: self.request.host().to_string(),
            addr,
        });
        self.transition(ConnectionState::Requesting);
        Flow::Send
    }

    /// The request has been handed to the protocol layer.
    pub fn on_request_sent(&mut self) -> Flow {
        if self.state != ConnectionState::Requesting {
            return self.stray("request sent");
        }
        self.physical_requests += 1;
        self.transition(ConnectionState::AwaitingHeaders);
        Flow::AwaitHeaders
    }

    /// Status line and headers are complete.
    pub fn on_headers(&mut self, meta: ResponseMeta) -> Flow {
        if self.state != ConnectionState::AwaitingHeaders {
            return self.stray("headers");
        }

        if let Some(target) = self.redirects.follow(self.request.url(), &meta) {
            debug!(
                status = meta.status,
                location = %target,
                taken = self.redirects.taken(),
                "following redirect"
            );
            self.options.emit(FetchEvent::Redirected {
                host: target.host_str().unwrap_or_default().to_string(),
                location: target.clone(),
            });
            self.request.retarget(target);
            self.transition(ConnectionState::Connecting);
            return Flow::Connect;
        }

        if self.redirects.exhausted() && crate::core::is_redirect(meta.status) {
            debug!(status = meta.status, "redirect limit reached, classifying response");
        }
        self.redirects.reset();

        self.options.emit(FetchEvent::Headers {
            status: meta.status,
            headers: meta.headers.clone(),
        });
        let status = meta.status;
        self.response = Some(meta);

        match status {
            200 | 204 => match self.sink.open(&self.request) {
                Ok(()) => {
                    self.transition(ConnectionState::StreamingBody);
                    Flow::Read
                }
                Err(e) => self.fail(ErrorKind::SinkOpenFailed, e.to_string()),
            },
            other => self.fail(ErrorKind::StatusRejected, format!("HTTP status {other}")),
        }
    }

    /// A body chunk arrived.
    pub fn on_data(&mut self, chunk: &[u8]) -> Flow {
        if self.outcome.is_some() {
            return Flow::Closed;
        }
        if self.state != ConnectionState::StreamingBody {
            return self.stray("data");
        }
        if let Err(e) = self.sink.write(chunk) {
            return self.fail(ErrorKind::Unknown, format!("write failed: {e}"));
        }
        Flow::Read
    }

    /// The response body is complete.
    pub fn on_end(&mut self) -> Flow {
        if self.outcome.is_some() {
            return Flow::Closed;
        }
        if self.state != ConnectionState::StreamingBody {
            return self.fail(
                ErrorKind::Unknown,
                format!("connection closed while {}", self.state),
            );
        }
        if let Err(e) = self.sink.close() {
            return self.fail(ErrorKind::Unknown, format!("failed to finish output: {e}"));
        }
        debug!(bytes = self.sink.written(), "body complete");
        self.transition(ConnectionState::Done);
        self.finish(Outcome::Success)
    }

    /// A collaborator reported a failure.
    pub fn on_error(&mut self, error: TransportError) -> Flow {
        if self.outcome.is_some() {
            return Flow::Closed;
        }
        let record = self.classifier.classify(error.kind());
        if record.ignore {
            warn!(kind = ?record.kind, %error, "ignoring certificate error");
            self.options.emit(FetchEvent::Error {
                kind: record.kind,
                ignored: true,
                detail: error.to_string(),
            });
            return self.resume();
        }
        self.fail(record.kind, error.to_string())
    }

    /// A step the loop performed (connect, send, head or read) failed.
    ///
    /// The step produced nothing to continue from, so this always ends the
    /// fetch, even for a kind the classifier would ignore. Tolerated
    /// certificate problems arrive through [`on_error`](Self::on_error).
    pub fn on_step_error(&mut self, error: TransportError) -> Flow {
        if self.outcome.is_some() {
            return Flow::Closed;
        }
        let record = self.classifier.classify(error.kind());
        if record.ignore {
            debug!(kind = ?record.kind, %error, "ignorable error aborted a step");
        }
        self.fail(record.kind, error.to_string())
    }

    fn fail(&mut self, kind: ErrorKind, detail: String) -> Flow {
        debug!(?kind, %detail, state = %self.state, "fetch failed");
        self.options.emit(FetchEvent::Error {
            kind,
            ignored: false,
            detail,
        });
        if let Err(e) = self.sink.close() {
            debug!(error = %e, "failed to close output after error");
        }
        self.transition(ConnectionState::Failed);
        self.finish(Outcome::Failure(kind))
    }

    fn finish(&mut self, outcome: Outcome) -> Flow {
        if self.outcome.is_some() {
            return Flow::Closed;
        }
        self.outcome = Some(outcome);
        self.options.emit(FetchEvent::Finished(outcome));
        Flow::Finished(outcome)
    }

    /// Flow implied by the current state.
    fn resume(&self) -> Flow {
        match self.state {
            ConnectionState::Idle | ConnectionState::Connecting => Flow::Connect,
            ConnectionState::Requesting => Flow::Send,
            ConnectionState::AwaitingHeaders => Flow::AwaitHeaders,
            ConnectionState::StreamingBody => Flow::Read,
            ConnectionState::Done | ConnectionState::Failed => Flow::Closed,
        }
    }

    fn stray(&self, event: &str) -> Flow {
        debug!(event, state = %self.state, "ignoring event in unexpected state");
        self.resume()
    }

    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}
