//! Error types for ufetch-core.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Classified failure of a fetch.
///
/// Every low-level signal a collaborator can raise ends up as one of these
/// kinds. Each kind carries a stable process outcome code for scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// TCP connect, name resolution or handshake failure.
    ConnectFailed,
    /// Certificate chain did not validate against the trust store.
    CertificateInvalid,
    /// Certificate is valid but not for the requested host.
    HostnameMismatch,
    /// Output destination could not be opened after the response was accepted.
    SinkOpenFailed,
    /// Final response status was neither accepted nor a redirect.
    StatusRejected,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Process exit code associated with this kind.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::ConnectFailed => 4,
            ErrorKind::CertificateInvalid | ErrorKind::HostnameMismatch => 5,
            ErrorKind::SinkOpenFailed => 3,
            ErrorKind::StatusRejected => 8,
            ErrorKind::Unknown => 1,
        }
    }

    /// Returns `true` for kinds produced by certificate validation.
    pub fn is_certificate(self) -> bool {
        matches!(self, ErrorKind::CertificateInvalid | ErrorKind::HostnameMismatch)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::ConnectFailed => "Connection failed",
            ErrorKind::CertificateInvalid => "Invalid SSL certificate",
            ErrorKind::HostnameMismatch => "Server hostname does not match SSL certificate",
            ErrorKind::SinkOpenFailed => "Cannot open output file",
            ErrorKind::StatusRejected => "HTTP status rejected",
            ErrorKind::Unknown => "Unknown error",
        };
        f.write_str(text)
    }
}

/// A classified error plus the decision whether the fetch may carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub ignore: bool,
}

/// Raw failure reported by the transport/protocol collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("certificate hostname mismatch: {0}")]
    HostnameMismatch(String),

    #[error("TLS support not available for {0}")]
    TlsUnavailable(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Map the raw signal onto the fetch taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Connect(_) => ErrorKind::ConnectFailed,
            TransportError::InvalidCertificate(_) => ErrorKind::CertificateInvalid,
            TransportError::HostnameMismatch(_) => ErrorKind::HostnameMismatch,
            TransportError::TlsUnavailable(_) | TransportError::Protocol(_) => ErrorKind::Unknown,
        }
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let detail = describe(&e);
        if e.is_connect() || e.is_timeout() {
            TransportError::Connect(detail)
        } else {
            TransportError::Protocol(detail)
        }
    }
}

/// Render an error together with its whole source chain.
pub(crate) fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Failures that prevent a fetch from starting at all.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("SSL support not available")]
    TlsUnavailable,

    #[error("failed to load CA certificates from {path}: {reason}")]
    CaCertificate { path: PathBuf, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
