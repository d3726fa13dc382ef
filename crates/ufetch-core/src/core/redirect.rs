use url::Url;

use crate::data::{Request, ResponseMeta};

/// Returns `true` if the HTTP status code asks the client to retry elsewhere.
///
/// # Recognized Redirect Codes
///
/// - 301: Moved Permanently
/// - 302: Found
/// - 303: See Other
/// - 307: Temporary Redirect
/// - 308: Permanent Redirect
///
/// # Examples
///
/// ```
/// use ufetch_core::is_redirect;
///
/// assert!(is_redirect(301));
/// assert!(is_redirect(302));
/// assert!(!is_redirect(200));
/// assert!(!is_redirect(304));
/// ```
pub fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Bounded redirect following for one fetch.
///
/// The counter grows by one for every redirect taken and resets once a
/// non-redirect response ends the chain. At the ceiling a relocation
/// response is no longer followed and gets classified by its status instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    max: u32,
    taken: u32,
}

impl RedirectPolicy {
    pub fn new(max: u32) -> Self {
        Self { max, taken: 0 }
    }

    /// Redirects followed so far in the current chain.
    pub fn taken(&self) -> u32 {
        self.taken
    }

    pub fn exhausted(&self) -> bool {
        self.taken >= self.max
    }

    /// Decide whether `meta` relocates the request currently aimed at `current`.
    ///
    /// Returns the resolved target and counts the redirect when it is taken.
    /// A missing or unresolvable `Location`, or one that leaves http/https,
    /// is not a relocation.
    pub fn follow(&mut self, current: &Url, meta: &ResponseMeta) -> Option<Url> {
        if self.exhausted() || !is_redirect(meta.status) {
            return None;
        }
        let target = meta
            .location()
            .and_then(|location| current.join(location.trim()).ok())
            .filter(Request::is_fetchable)?;
        self.taken += 1;
        Some(target)
    }

    /// Re-arm the counter after the chain ends.
    pub fn reset(&mut self) {
        self.taken = 0;
    }
}
