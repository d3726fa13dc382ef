use std::fmt;

use url::Url;

use crate::error::FetchError;

/// HTTP method. Only GET is issued by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of one logical fetch.
///
/// Created once per fetch and rewritten in place whenever a redirect is
/// followed. The URL always has an `http` or `https` scheme and a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: Url,
    method: Method,
}

impl Request {
    /// Build a GET request for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the URL does not parse or has no
    /// host, and [`FetchError::UnsupportedScheme`] for anything other than
    /// `http`/`https`.
    pub fn get(url: &str) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        Self::from_url(url)
    }

    /// Whether `url` names something this crate can fetch: `http` or
    /// `https` with a host.
    pub fn is_fetchable(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    }

    pub fn from_url(url: Url) -> Result<Self, FetchError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none() {
            return Err(FetchError::InvalidUrl(format!("{url}: missing host")));
        }
        Ok(Self {
            url,
            method: Method::Get,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or the scheme default.
    pub fn port(&self) -> u16 {
        self.url
            .port_or_known_default()
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    /// Path plus query, as sent on the request line.
    pub fn location(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Point the request at a new target. Used by the redirect policy only.
    pub(crate) fn retarget(&mut self, url: Url) {
        debug_assert!(Self::is_fetchable(&url), "retarget to {url}");
        self.url = url;
    }
}
