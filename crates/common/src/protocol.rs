//! Request and response types exchanged at the invocation boundary.
//!
//! Field names follow the camelCase wire format used by existing callers
//! (`encryptedDataKey`, `encryptedData`, `iv`, `algorithm`, `statusCode`).

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ServiceError};

/// Algorithm identifier assumed when a decrypt request omits `algorithm`.
pub const DEFAULT_ALGORITHM: &str = "aes-256-gcm";

/// The two operations exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    /// Lower-case operation name used in log fields and messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
        }
    }

    /// Error code reported for any non-authorization failure.
    pub fn failure_code(self) -> &'static str {
        match self {
            Operation::Encrypt => "ENCRYPTION_FAILED",
            Operation::Decrypt => "DECRYPTION_FAILED",
        }
    }
}

// ---------------------------------------------------------------------------
// Encrypt
// ---------------------------------------------------------------------------

/// Wire request for the encrypt operation.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// UTF-8 text to encrypt. Required and non-empty.
    #[serde(default)]
    pub plaintext: Option<String>,
}

impl std::fmt::Debug for EncryptRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptRequest")
            .field("plaintext", &self.plaintext.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Transport encoding of an encryption envelope.
///
/// Returned by encrypt and consumed (after validation) by decrypt. The three
/// byte fields are standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedEnvelope {
    /// Data key wrapped by the Key Service.
    pub encrypted_data_key: String,
    /// Ciphertext with the authentication tag appended.
    pub encrypted_data: String,
    /// Initialization vector.
    pub iv: String,
    /// Cipher algorithm identifier.
    pub algorithm: String,
}

// ---------------------------------------------------------------------------
// Decrypt
// ---------------------------------------------------------------------------

/// Wire request for the decrypt operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    #[serde(default)]
    pub encrypted_data_key: Option<String>,
    #[serde(default)]
    pub encrypted_data: Option<String>,
    #[serde(default)]
    pub iv: Option<String>,
    /// Defaults to [`DEFAULT_ALGORITHM`] when absent or empty.
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Caller identity supplied by the invoking database session, if any.
    #[serde(default)]
    pub request_user: Option<String>,
}

/// Successful decrypt response body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub decrypted: String,
}

impl std::fmt::Debug for DecryptResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DecryptResponse { decrypted: [REDACTED] }")
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Error body returned on any non-200 status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// `ACCESS_DENIED`, `ENCRYPTION_FAILED`, `DECRYPTION_FAILED` or `NOT_FOUND`.
    pub error: String,
    /// Taxonomy kind (`structural`, `access_denied`, `key_service`, `cipher`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] without a taxonomy kind.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
            message: message.into(),
        }
    }

    /// Build the error body reported for `err` raised by `op`.
    pub fn from_error(op: Operation, err: &ServiceError) -> Self {
        let kind = err.kind();
        let (error, message) = match kind {
            ErrorKind::AccessDenied => (
                "ACCESS_DENIED".to_owned(),
                format!("No permission to {}", op.as_str()),
            ),
            _ => (op.failure_code().to_owned(), err.to_string()),
        };
        Self {
            error,
            kind: Some(kind.as_str().to_owned()),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation response
// ---------------------------------------------------------------------------

/// Payload carried in [`InvocationResponse::body`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Encrypted(EncodedEnvelope),
    Decrypted(DecryptResponse),
    Error(ErrorResponse),
}

/// Structured result of one invocation: a status classifier plus a payload or
/// error descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl InvocationResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: ResponseBody) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    /// The error response for `err` raised by `op`.
    pub fn failure(op: Operation, err: &ServiceError) -> Self {
        Self {
            status_code: err.http_status(),
            body: ResponseBody::Error(ErrorResponse::from_error(op, err)),
        }
    }

    /// Returns `true` for a 200 response.
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` once the process is serving.
    pub status: String,
    /// Algorithm used for new encryptions.
    pub algorithm: String,
}
