use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use url::Url;

use crate::error::ErrorKind;

/// Default ceiling on redirects followed within one fetch.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Terminal result of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Process exit code: 0 on success, otherwise the kind's code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure(kind) => kind.exit_code(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure(kind) => write!(f, "failure: {kind}"),
        }
    }
}

/// Notifications emitted while a fetch progresses.
///
/// The callback sees:
/// - `Connecting` once per physical request, after the remote address is known
/// - `Redirected` for every redirect actually followed
/// - `Headers` for the final (non-redirect) response only
/// - `Error` for every classified error, including ignored ones
/// - `Finished` exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Connecting {
        host: String,
        addr: Option<SocketAddr>,
    },
    Redirected {
        host: String,
        location: Url,
    },
    Headers {
        status: u16,
        headers: Vec<(String, String)>,
    },
    Error {
        kind: ErrorKind,
        ignored: bool,
        detail: String,
    },
    Finished(Outcome),
}

/// Configuration for a fetch.
///
/// # Examples
///
/// ```
/// use ufetch_core::FetchOptions;
///
/// let options = FetchOptions::default()
///     .max_redirects(5)
///     .verify_certificates(false);
/// assert_eq!(options.max_redirects, 5);
/// ```
#[derive(Clone)]
pub struct FetchOptions {
    /// Redirects followed before a relocation response is classified like
    /// any other status.
    ///
    /// Default: 10
    pub max_redirects: u32,

    /// Whether certificate failures abort the fetch.
    ///
    /// When `false`, invalid certificates and hostname mismatches are still
    /// reported through [`FetchEvent::Error`] with `ignored: true`.
    ///
    /// Default: true
    pub verify_certificates: bool,

    /// Value of the `User-Agent` header.
    pub user_agent: String,

    /// Event callback, invoked synchronously on the loop's thread.
    ///
    /// Default: None
    pub on_event: Option<Arc<dyn Fn(&FetchEvent) + Send + Sync>>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("max_redirects", &self.max_redirects)
            .field("verify_certificates", &self.verify_certificates)
            .field("user_agent", &self.user_agent)
            .field("on_event", &self.on_event.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verify_certificates: true,
            user_agent: concat!("ufetch/", env!("CARGO_PKG_VERSION")).to_string(),
            on_event: None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    #[must_use]
    pub fn verify_certificates(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the event callback.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ufetch_core::{FetchEvent, FetchOptions};
    ///
    /// let options = FetchOptions::default().on_event(Arc::new(|event: &FetchEvent| {
    ///     if let FetchEvent::Finished(outcome) = event {
    ///         eprintln!("done: {outcome}");
    ///     }
    /// }));
    /// assert!(options.on_event.is_some());
    /// ```
    #[must_use]
    pub fn on_event(mut self, on_event: Arc<dyn Fn(&FetchEvent) + Send + Sync>) -> Self {
        self.on_event = Some(on_event);
        self
    }

    pub(crate) fn emit(&self, event: FetchEvent) {
        if let Some(ref callback) = self.on_event {
            callback(&event);
        }
    }
}
