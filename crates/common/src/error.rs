//! Error taxonomy shared by the encrypt and decrypt operations.

use thiserror::Error;

/// Top-level service error type.
///
/// Every failure of an encrypt or decrypt invocation is one of these four
/// kinds. Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::AccessDenied`] → 403
/// - everything else → 500
///
/// Messages are built from field names and error codes only; they must never
/// contain plaintext, decrypted output, or key material.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed or incomplete. Raised before any remote call.
    #[error("invalid request: {0}")]
    Structural(String),

    /// The Key Service refused the caller.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The Key Service call failed for any reason other than authorization.
    #[error("key service failure: {0}")]
    KeyService(String),

    /// The local symmetric operation failed after a successful key exchange.
    #[error("cipher failure: {0}")]
    Cipher(String),
}

/// Machine-readable classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    AccessDenied,
    KeyService,
    Cipher,
}

impl ErrorKind {
    /// Stable snake_case label used in responses and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Structural => "structural",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::KeyService => "key_service",
            ErrorKind::Cipher => "cipher",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    /// Shorthand for a [`ServiceError::Structural`] error.
    pub fn structural(msg: impl Into<String>) -> Self {
        ServiceError::Structural(msg.into())
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Structural(_) => ErrorKind::Structural,
            ServiceError::AccessDenied(_) => ErrorKind::AccessDenied,
            ServiceError::KeyService(_) => ErrorKind::KeyService,
            ServiceError::Cipher(_) => ErrorKind::Cipher,
        }
    }

    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::AccessDenied(_) => 403,
            ServiceError::Structural(_)
            | ServiceError::KeyService(_)
            | ServiceError::Cipher(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::structural("x").http_status(), 500);
        assert_eq!(ServiceError::AccessDenied("x".into()).http_status(), 403);
        assert_eq!(ServiceError::KeyService("x".into()).http_status(), 500);
        assert_eq!(ServiceError::Cipher("x".into()).http_status(), 500);
    }

    #[test]
    fn kinds_are_distinct() {
        assert_eq!(ServiceError::structural("x").kind(), ErrorKind::Structural);
        assert_eq!(
            ServiceError::AccessDenied("x".into()).kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(ServiceError::KeyService("x".into()).kind(), ErrorKind::KeyService);
        assert_eq!(ServiceError::Cipher("x".into()).kind().as_str(), "cipher");
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::structural("missing field: iv");
        assert!(e.to_string().contains("missing field: iv"));
    }
}
