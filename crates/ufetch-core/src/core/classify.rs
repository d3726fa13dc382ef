use crate::error::{ErrorKind, ErrorRecord};

/// Decides which classified errors a fetch may survive.
///
/// Only certificate kinds can be ignored, and only when verification has
/// been turned off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassifier {
    verify: bool,
}

impl ErrorClassifier {
    pub fn new(verify_certificates: bool) -> Self {
        Self {
            verify: verify_certificates,
        }
    }

    pub fn classify(&self, kind: ErrorKind) -> ErrorRecord {
        ErrorRecord {
            kind,
            ignore: kind.is_certificate() && !self.verify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ErrorKind; 6] = [
        ErrorKind::ConnectFailed,
        ErrorKind::CertificateInvalid,
        ErrorKind::HostnameMismatch,
        ErrorKind::SinkOpenFailed,
        ErrorKind::StatusRejected,
        ErrorKind::Unknown,
    ];

    #[test]
    fn test_nothing_ignored_when_verifying() {
        let classifier = ErrorClassifier::new(true);
        for kind in ALL {
            let record = classifier.classify(kind);
            assert_eq!(record.kind, kind);
            assert!(!record.ignore, "{kind:?} must be fatal");
        }
    }

    #[test]
    fn test_only_certificate_kinds_ignored_without_verification() {
        let classifier = ErrorClassifier::new(false);
        for kind in ALL {
            assert_eq!(classifier.classify(kind).ignore, kind.is_certificate(), "{kind:?}");
        }
    }
}
