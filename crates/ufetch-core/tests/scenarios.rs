use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use ufetch_core::{
    ErrorKind, Exchange, FetchError, FetchEvent, FetchOptions, Fetcher, Outcome, Request,
    ResponseMeta, SinkOpener, TransportError,
};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// One physical request/response exchange.
#[derive(Clone)]
struct Hop {
    connect: Result<Option<SocketAddr>, TransportError>,
    certificate: Vec<TransportError>,
    head: Result<ResponseMeta, TransportError>,
    body: Vec<Result<Bytes, TransportError>>,
}

impl Hop {
    fn status(status: u16) -> Self {
        Self {
            connect: Ok(Some("192.0.2.1:80".parse().unwrap())),
            certificate: Vec::new(),
            head: Ok(ResponseMeta::new(status)),
            body: Vec::new(),
        }
    }

    fn redirect(status: u16, location: &str) -> Self {
        let mut hop = Self::status(status);
        hop.head = Ok(ResponseMeta::new(status).header("Location", location));
        hop
    }

    fn body(mut self, chunks: &[&str]) -> Self {
        self.body = chunks.iter().map(|c| Ok(Bytes::from(c.to_string()))).collect();
        self
    }

    fn certificate(mut self, failure: TransportError) -> Self {
        self.certificate.push(failure);
        self
    }

    fn refused() -> Self {
        let mut hop = Self::status(0);
        hop.connect = Err(TransportError::Connect("connection refused".into()));
        hop
    }
}

struct ScriptedExchange {
    hops: VecDeque<Hop>,
    tls: bool,
    head: Option<Result<ResponseMeta, TransportError>>,
    certificate: Vec<TransportError>,
    body: VecDeque<Result<Bytes, TransportError>>,
    requested: Vec<String>,
    connects: u32,
    head_calls: u32,
    disconnects: u32,
}

impl ScriptedExchange {
    fn new(hops: Vec<Hop>) -> Self {
        Self {
            hops: hops.into(),
            tls: true,
            head: None,
            certificate: Vec::new(),
            body: VecDeque::new(),
            requested: Vec::new(),
            connects: 0,
            head_calls: 0,
            disconnects: 0,
        }
    }

    fn without_tls(mut self) -> Self {
        self.tls = false;
        self
    }
}

impl Exchange for ScriptedExchange {
    fn supports_tls(&self) -> bool {
        self.tls
    }

    async fn connect(&mut self, _request: &Request) -> Result<Option<SocketAddr>, TransportError> {
        self.connects += 1;
        self.head = None;
        self.body.clear();
        let hop = self
            .hops
            .pop_front()
            .ok_or_else(|| TransportError::Connect("script exhausted".into()))?;
        self.head = Some(hop.head);
        self.certificate = hop.certificate;
        self.body = hop.body.into();
        hop.connect
    }

    fn send(&mut self, request: &Request) -> Result<(), TransportError> {
        self.requested.push(request.url().to_string());
        Ok(())
    }

    async fn head(&mut self) -> Result<ResponseMeta, TransportError> {
        self.head_calls += 1;
        self.head
            .take()
            .unwrap_or_else(|| Err(TransportError::Protocol("no request in flight".into())))
    }

    async fn read(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.body.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn verification_failures(&mut self) -> Vec<TransportError> {
        std::mem::take(&mut self.certificate)
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }
}

#[derive(Default, Debug, PartialEq)]
struct SinkLog {
    opens: u32,
    closes: u32,
    data: Vec<u8>,
}

#[derive(Clone, Default)]
struct MemoryOpener {
    log: Rc<RefCell<SinkLog>>,
    fail: bool,
}

impl MemoryOpener {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn contents(&self) -> Vec<u8> {
        self.log.borrow().data.clone()
    }

    fn opens(&self) -> u32 {
        self.log.borrow().opens
    }

    fn closes(&self) -> u32 {
        self.log.borrow().closes
    }
}

struct MemorySink(Rc<RefCell<SinkLog>>);

impl io::Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.0.borrow_mut().closes += 1;
    }
}

impl SinkOpener for MemoryOpener {
    type Sink = MemorySink;

    fn open(&mut self, _request: &Request) -> io::Result<MemorySink> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only destination"));
        }
        self.log.borrow_mut().opens += 1;
        Ok(MemorySink(Rc::clone(&self.log)))
    }
}

fn recording_options() -> (FetchOptions, Arc<Mutex<Vec<FetchEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let options = FetchOptions::default().on_event(Arc::new(move |event: &FetchEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    (options, events)
}

fn finished_count(events: &Arc<Mutex<Vec<FetchEvent>>>) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, FetchEvent::Finished(_)))
        .count()
}

async fn run(
    hops: Vec<Hop>,
    url: &str,
    options: FetchOptions,
) -> (Outcome, MemoryOpener, ScriptedExchange) {
    let opener = MemoryOpener::default();
    let mut fetcher = Fetcher::new(ScriptedExchange::new(hops), options);
    let outcome = fetcher.fetch(url, opener.clone()).await.unwrap();
    (outcome, opener, fetcher.into_exchange())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_accepted_response_streams_body() {
    let (options, events) = recording_options();
    let hops = vec![Hop::status(200).body(&["hello"])];

    let (outcome, opener, exchange) = run(hops, "http://example.com/file", options).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(opener.contents(), b"hello");
    assert_eq!(opener.opens(), 1);
    assert_eq!(opener.closes(), 1);
    assert_eq!(exchange.requested.len(), 1);
    assert_eq!(exchange.disconnects, 1);
    assert_eq!(finished_count(&events), 1);
}

#[tokio::test]
async fn test_redirect_then_accept() {
    let (options, events) = recording_options();
    let hops = vec![
        Hop::redirect(301, "http://other/path").body(&["moved"]),
        Hop::status(200).body(&["second ", "body"]),
    ];

    let (outcome, opener, exchange) = run(hops, "http://example.com/start", options).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(
        exchange.requested,
        vec!["http://example.com/start".to_string(), "http://other/path".to_string()]
    );
    assert_eq!(opener.contents(), b"second body");
    assert_eq!(opener.opens(), 1);

    let events = events.lock().unwrap();
    let redirects: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            FetchEvent::Redirected { host, location } => Some((host.clone(), location.to_string())),
            _ => None,
        })
        .collect();
    assert_eq!(redirects, vec![("other".to_string(), "http://other/path".to_string())]);
    // headers are only reported for the response that ends the chain
    let statuses: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            FetchEvent::Headers { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![200]);
}

#[tokio::test]
async fn test_rejected_status() {
    let (options, events) = recording_options();

    let (outcome, opener, _) =
        run(vec![Hop::status(404)], "http://example.com/missing", options).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::StatusRejected));
    assert_eq!(outcome.exit_code(), 8);
    assert_eq!(opener.opens(), 0);
    assert_eq!(finished_count(&events), 1);
}

#[tokio::test]
async fn test_invalid_certificate_with_verification() {
    let hops = vec![
        Hop::status(200)
            .body(&["secret"])
            .certificate(TransportError::InvalidCertificate("UnknownIssuer".into())),
    ];

    let (outcome, opener, _) = run(hops, "https://example.com/", FetchOptions::default()).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::CertificateInvalid));
    assert_eq!(outcome.exit_code(), 5);
    assert_eq!(opener.opens(), 0);
}

#[tokio::test]
async fn test_hostname_mismatch_with_verification() {
    let mut hop =
        Hop::status(0).certificate(TransportError::HostnameMismatch("NotValidForName".into()));
    hop.head = Err(TransportError::Connect("invalid peer certificate".into()));

    let (outcome, opener, _) =
        run(vec![hop], "https://example.com/", FetchOptions::default()).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::HostnameMismatch));
    assert_eq!(outcome.exit_code(), 5);
    assert_eq!(opener.opens(), 0);
}

#[tokio::test]
async fn test_certificate_error_ignored_without_verification() {
    let (options, events) = recording_options();
    let hops = vec![
        Hop::status(200)
            .body(&["ok"])
            .certificate(TransportError::InvalidCertificate("UnknownIssuer".into())),
    ];

    let (outcome, opener, _) =
        run(hops, "https://example.com/", options.verify_certificates(false)).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(opener.contents(), b"ok");
    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        FetchEvent::Error {
            kind: ErrorKind::CertificateInvalid,
            ignored: true,
            ..
        }
    )));
}

#[tokio::test]
async fn test_redirect_loop_is_cut_at_ceiling() {
    let (options, events) = recording_options();
    let hops: Vec<_> = (0..15).map(|_| Hop::redirect(302, "/again")).collect();

    let (outcome, opener, exchange) = run(hops, "http://example.com/again", options).await;

    // ten redirects followed, the eleventh response is classified by status
    assert_eq!(exchange.requested.len(), 11);
    assert_eq!(exchange.hops.len(), 4);
    assert_eq!(outcome, Outcome::Failure(ErrorKind::StatusRejected));
    assert_eq!(opener.opens(), 0);

    let events = events.lock().unwrap();
    let followed = events
        .iter()
        .filter(|e| matches!(e, FetchEvent::Redirected { .. }))
        .count();
    assert_eq!(followed, 10);
}

#[tokio::test]
async fn test_ten_redirects_then_accept() {
    let mut hops: Vec<_> = (0..10).map(|i| Hop::redirect(307, &format!("/hop{i}"))).collect();
    hops.push(Hop::status(200).body(&["final"]));

    let (outcome, opener, exchange) =
        run(hops, "http://example.com/", FetchOptions::default()).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(exchange.requested.len(), 11);
    assert_eq!(exchange.requested.last().map(String::as_str), Some("http://example.com/hop9"));
    assert_eq!(opener.contents(), b"final");
}

#[tokio::test]
async fn test_custom_redirect_ceiling() {
    let hops = vec![Hop::redirect(301, "/a"), Hop::redirect(301, "/b")];

    let options = FetchOptions::default().max_redirects(1);
    let (outcome, _, exchange) = run(hops, "http://example.com/", options).await;

    assert_eq!(exchange.requested.len(), 2);
    assert_eq!(outcome, Outcome::Failure(ErrorKind::StatusRejected));
}

#[tokio::test]
async fn test_connect_failure() {
    let (options, events) = recording_options();

    let (outcome, opener, exchange) =
        run(vec![Hop::refused()], "http://example.com/", options).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::ConnectFailed));
    assert_eq!(outcome.exit_code(), 4);
    assert!(exchange.requested.is_empty());
    assert_eq!(opener.opens(), 0);
    assert!(
        !events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, FetchEvent::Connecting { .. }))
    );
}

#[tokio::test]
async fn test_sink_open_failure() {
    let opener = MemoryOpener::failing();
    let mut fetcher = Fetcher::new(
        ScriptedExchange::new(vec![Hop::status(200).body(&["data"])]),
        FetchOptions::default(),
    );

    let outcome = fetcher.fetch("http://example.com/file", opener.clone()).await.unwrap();

    assert_eq!(outcome, Outcome::Failure(ErrorKind::SinkOpenFailed));
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(opener.closes(), 0);
}

#[tokio::test]
async fn test_no_content_opens_empty_sink() {
    let (outcome, opener, _) =
        run(vec![Hop::status(204)], "http://example.com/", FetchOptions::default()).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(opener.opens(), 1);
    assert_eq!(opener.closes(), 1);
    assert!(opener.contents().is_empty());
}

#[tokio::test]
async fn test_chunks_arrive_in_order_and_empty_chunks_are_skipped() {
    let hops = vec![Hop::status(200).body(&["a", "", "bc", "", "def"])];

    let (outcome, opener, _) = run(hops, "http://example.com/", FetchOptions::default()).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(opener.contents(), b"abcdef");
}

#[tokio::test]
async fn test_error_mid_stream_closes_sink_once() {
    let (options, events) = recording_options();
    let mut hop = Hop::status(200).body(&["part"]);
    hop.body.push(Err(TransportError::Protocol("connection reset".into())));
    hop.body.push(Ok(Bytes::from_static(b"never")));

    let (outcome, opener, _) = run(vec![hop], "http://example.com/", options).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::Unknown));
    assert_eq!(opener.contents(), b"part");
    assert_eq!(opener.opens(), 1);
    assert_eq!(opener.closes(), 1);
    assert_eq!(finished_count(&events), 1);
}

#[tokio::test]
async fn test_https_without_tls_is_refused() {
    let opener = MemoryOpener::default();
    let mut fetcher = Fetcher::new(
        ScriptedExchange::new(vec![Hop::status(200)]).without_tls(),
        FetchOptions::default(),
    );

    let err = fetcher.fetch("https://example.com/", opener.clone()).await.unwrap_err();

    assert!(matches!(err, FetchError::TlsUnavailable));
    assert!(fetcher.exchange().requested.is_empty());
    assert_eq!(opener.opens(), 0);
}

#[tokio::test]
async fn test_invalid_url_is_refused() {
    let mut fetcher = Fetcher::new(ScriptedExchange::new(Vec::new()), FetchOptions::default());

    let err = fetcher.fetch("ftp://example.com/", MemoryOpener::default()).await.unwrap_err();

    assert!(matches!(err, FetchError::UnsupportedScheme(_)));
}

#[tokio::test]
async fn test_replay_is_deterministic() {
    let script = || {
        vec![
            Hop::redirect(302, "/next"),
            Hop::status(200).body(&["one", "two", "three"]),
        ]
    };

    let (first, first_sink, _) =
        run(script(), "http://example.com/", FetchOptions::default()).await;
    let (second, second_sink, _) =
        run(script(), "http://example.com/", FetchOptions::default()).await;

    assert_eq!(first, second);
    assert_eq!(first_sink.contents(), second_sink.contents());
    assert_eq!(*first_sink.log.borrow(), *second_sink.log.borrow());
}

#[tokio::test]
async fn test_redirect_budget_is_per_fetch() {
    let chain = || {
        let mut hops: Vec<_> = (0..10).map(|_| Hop::redirect(302, "/loop")).collect();
        hops.push(Hop::status(200).body(&["x"]));
        hops
    };
    let mut hops = chain();
    hops.extend(chain());
    let mut fetcher = Fetcher::new(ScriptedExchange::new(hops), FetchOptions::default());

    let first = fetcher.fetch("http://example.com/", MemoryOpener::default()).await.unwrap();
    let second = fetcher.fetch("http://example.com/", MemoryOpener::default()).await.unwrap();

    assert_eq!(first, Outcome::Success);
    assert_eq!(second, Outcome::Success);
    assert_eq!(fetcher.exchange().requested.len(), 22);
}

#[tokio::test]
async fn test_redirect_to_other_scheme_is_rejected() {
    let hops = vec![Hop::redirect(302, "ftp://other/file"), Hop::status(200).body(&["x"])];

    let (outcome, opener, exchange) =
        run(hops, "http://example.com/", FetchOptions::default()).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::StatusRejected));
    assert_eq!(outcome.exit_code(), 8);
    assert_eq!(exchange.requested, vec!["http://example.com/".to_string()]);
    assert_eq!(opener.opens(), 0);
}

#[tokio::test]
async fn test_certificate_error_from_connect_is_not_retried() {
    let mut hop = Hop::status(200).body(&["data"]);
    hop.connect = Err(TransportError::HostnameMismatch("NotValidForName".into()));
    let options = FetchOptions::default().verify_certificates(false);

    let (outcome, opener, exchange) =
        run(vec![hop, Hop::status(200)], "https://example.com/", options).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::HostnameMismatch));
    assert_eq!(exchange.connects, 1);
    assert_eq!(exchange.head_calls, 0);
    assert_eq!(opener.opens(), 0);
}

#[tokio::test]
async fn test_certificate_error_from_head_is_not_retried() {
    let mut hop = Hop::status(200);
    hop.head = Err(TransportError::InvalidCertificate("UnknownIssuer".into()));
    let (options, events) = recording_options();
    let options = options.verify_certificates(false);

    let (outcome, _, exchange) = run(vec![hop], "https://example.com/", options).await;

    assert_eq!(outcome, Outcome::Failure(ErrorKind::CertificateInvalid));
    assert_eq!(exchange.connects, 1);
    assert_eq!(exchange.head_calls, 1);
    assert_eq!(finished_count(&events), 1);
}
