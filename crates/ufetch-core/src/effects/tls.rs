//! Optional TLS capability.
//!
//! With the `tls` feature, [`TlsProvider`] wraps a rustls trust store and a
//! certificate verifier that records every failure it sees. Without the
//! feature the type has no values, so `Option<TlsProvider>` is always `None`
//! and `https` targets are refused up front.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::TransportError;

/// Certificate failures recorded during handshakes, shared with the verifier.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    inner: Arc<Mutex<Vec<TransportError>>>,
}

impl FailureLog {
    pub fn record(&self, failure: TransportError) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub fn drain(&self) -> Vec<TransportError> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(feature = "tls")]
pub use rustls_impl::TlsProvider;

#[cfg(not(feature = "tls"))]
pub use disabled::TlsProvider;

#[cfg(feature = "tls")]
mod rustls_impl {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::sync::Arc;

    use rustls::client::WebPkiServerVerifier;
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::CryptoProvider;
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
    use tracing::debug;

    use super::FailureLog;
    use crate::error::{FetchError, Result, TransportError};

    /// Trust store plus crypto backend for `https` targets.
    #[derive(Debug, Clone)]
    pub struct TlsProvider {
        roots: RootCertStore,
        crypto: Arc<CryptoProvider>,
    }

    impl TlsProvider {
        /// Provider trusting the bundled WebPKI roots.
        pub fn new() -> Self {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Self {
                roots,
                crypto: Arc::new(rustls::crypto::ring::default_provider()),
            }
        }

        /// Trust the PEM certificates in `path` as well.
        ///
        /// Returns the number of certificates added.
        pub fn add_ca_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
            let path = path.as_ref();
            let ca_error = |reason: String| FetchError::CaCertificate {
                path: path.to_path_buf(),
                reason,
            };

            let file = File::open(path).map_err(|e| ca_error(e.to_string()))?;
            let mut reader = BufReader::new(file);
            let mut added = 0;
            for cert in rustls_pemfile::certs(&mut reader) {
                let cert = cert.map_err(|e| ca_error(e.to_string()))?;
                self.roots.add(cert).map_err(|e| ca_error(e.to_string()))?;
                added += 1;
            }
            if added == 0 {
                return Err(ca_error("no certificates found".to_string()));
            }
            debug!(path = %path.display(), added, "loaded CA certificates");
            Ok(added)
        }

        pub fn root_count(&self) -> usize {
            self.roots.len()
        }

        /// rustls configuration whose verifier reports into `failures`.
        ///
        /// With `verify` off, certificate failures are recorded and the
        /// handshake continues.
        pub fn client_config(
            &self,
            verify: bool,
            failures: FailureLog,
        ) -> Result<rustls::ClientConfig> {
            let inner = WebPkiServerVerifier::builder_with_provider(
                Arc::new(self.roots.clone()),
                Arc::clone(&self.crypto),
            )
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

            let verifier = RecordingVerifier {
                inner,
                verify,
                failures,
            };

            let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&self.crypto))
                .with_safe_default_protocol_versions()
                .map_err(|e| FetchError::Client(e.to_string()))?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
                .with_no_client_auth();
            Ok(config)
        }

        #[cfg(feature = "reqwest")]
        pub(crate) fn configure(
            &self,
            builder: reqwest::ClientBuilder,
            verify: bool,
            failures: FailureLog,
        ) -> Result<reqwest::ClientBuilder> {
            Ok(builder.use_preconfigured_tls(self.client_config(verify, failures)?))
        }
    }

    impl Default for TlsProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[derive(Debug)]
    struct RecordingVerifier {
        inner: Arc<WebPkiServerVerifier>,
        verify: bool,
        failures: FailureLog,
    }

    impl ServerCertVerifier for RecordingVerifier {
        fn verify_server_cert(
            &self,
            end_entity: &CertificateDer<'_>,
            intermediates: &[CertificateDer<'_>],
            server_name: &ServerName<'_>,
            ocsp_response: &[u8],
            now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            match self
                .inner
                .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
            {
                Ok(verified) => Ok(verified),
                Err(rustls::Error::InvalidCertificate(reason)) => {
                    self.failures.record(certificate_failure(&reason));
                    if self.verify {
                        Err(rustls::Error::InvalidCertificate(reason))
                    } else {
                        Ok(ServerCertVerified::assertion())
                    }
                }
                Err(other) => Err(other),
            }
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            self.inner.verify_tls12_signature(message, cert, dss)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            self.inner.verify_tls13_signature(message, cert, dss)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.inner.supported_verify_schemes()
        }
    }

    pub(super) fn certificate_failure(reason: &CertificateError) -> TransportError {
        let detail = format!("{reason:?}");
        // NotValidForName gained a context-carrying sibling in later rustls releases
        if detail.starts_with("NotValidForName") {
            TransportError::HostnameMismatch(detail)
        } else {
            TransportError::InvalidCertificate(detail)
        }
    }
}

#[cfg(not(feature = "tls"))]
mod disabled {
    /// Placeholder with no values: this build has no TLS support.
    #[derive(Debug, Clone)]
    pub enum TlsProvider {}

    #[cfg(feature = "reqwest")]
    impl TlsProvider {
        pub(crate) fn configure(
            &self,
            _builder: reqwest::ClientBuilder,
            _verify: bool,
            _failures: super::FailureLog,
        ) -> crate::error::Result<reqwest::ClientBuilder> {
            match *self {}
        }
    }
}
