//! [`EnvelopeService`]: the encrypt and decrypt operations.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::ServiceError;
use tracing::debug;
use zeroize::Zeroize;

use super::EncryptionEnvelope;
use crate::crypto::{cipher, Algorithm, CipherError};
use crate::kms::{DataKeyPair, KeyService, KeyServiceError, KeySpec};

/// Stateless envelope encryption over a shared [`KeyService`].
///
/// Everything held here is immutable after construction, so one instance is
/// shared by all concurrent requests without locking.
pub struct EnvelopeService {
    key_service: Arc<dyn KeyService>,
    master_key_id: String,
    algorithm: Algorithm,
    call_timeout: Duration,
}

impl EnvelopeService {
    /// Create a service that wraps new data keys under `master_key_id`,
    /// encrypts with `algorithm`, and bounds each Key Service call by
    /// `call_timeout` unless the caller supplies its own deadline.
    pub fn new(
        key_service: Arc<dyn KeyService>,
        master_key_id: impl Into<String>,
        algorithm: Algorithm,
        call_timeout: Duration,
    ) -> Self {
        Self {
            key_service,
            master_key_id: master_key_id.into(),
            algorithm,
            call_timeout,
        }
    }

    /// Algorithm used for new encryptions.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Default deadline for each Key Service call.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Encrypt `plaintext` under a fresh data key.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeService::encrypt_within`].
    pub async fn encrypt(&self, plaintext: &str) -> Result<EncryptionEnvelope, ServiceError> {
        self.encrypt_within(plaintext, self.call_timeout).await
    }

    /// Encrypt `plaintext`, allowing the Key Service call at most `deadline`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Structural`] if `plaintext` is empty (no remote call
    ///   is made).
    /// - [`ServiceError::AccessDenied`] if the Key Service refuses the caller.
    /// - [`ServiceError::KeyService`] on any other Key Service failure,
    ///   including an exceeded deadline.
    /// - [`ServiceError::Cipher`] if sealing fails.
    pub async fn encrypt_within(
        &self,
        plaintext: &str,
        deadline: Duration,
    ) -> Result<EncryptionEnvelope, ServiceError> {
        if plaintext.is_empty() {
            return Err(ServiceError::structural("plaintext cannot be empty"));
        }

        let DataKeyPair {
            plaintext: data_key,
            wrapped,
        } = with_deadline(
            deadline,
            self.key_service
                .generate_data_key(&self.master_key_id, KeySpec::Aes256),
        )
        .await?;

        let iv = cipher::generate_iv(self.algorithm);
        let ciphertext = cipher::seal(self.algorithm, &data_key, &iv, plaintext.as_bytes())?;
        drop(data_key);

        debug!(algorithm = %self.algorithm, "payload sealed");
        Ok(EncryptionEnvelope {
            wrapped_data_key: wrapped,
            ciphertext,
            iv,
            algorithm: self.algorithm.id().to_owned(),
        })
    }

    /// Decrypt `envelope`.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeService::decrypt_within`].
    pub async fn decrypt(&self, envelope: &EncryptionEnvelope) -> Result<String, ServiceError> {
        self.decrypt_within(envelope, self.call_timeout).await
    }

    /// Decrypt `envelope`, allowing the Key Service call at most `deadline`.
    ///
    /// The cipher is chosen from `envelope.algorithm`, never from this
    /// service's configured encryption algorithm.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Structural`] if a mandatory field is empty (no remote
    ///   call is made).
    /// - [`ServiceError::AccessDenied`] if the Key Service refuses to unwrap.
    /// - [`ServiceError::KeyService`] on any other Key Service failure.
    /// - [`ServiceError::Cipher`] on an unknown algorithm, IV mismatch, tag
    ///   verification failure, or non-UTF-8 plaintext.
    pub async fn decrypt_within(
        &self,
        envelope: &EncryptionEnvelope,
        deadline: Duration,
    ) -> Result<String, ServiceError> {
        envelope.ensure_complete()?;

        let data_key = with_deadline(
            deadline,
            self.key_service.unwrap_key(&envelope.wrapped_data_key),
        )
        .await?;

        let algorithm: Algorithm = envelope.algorithm.parse()?;
        let plaintext = cipher::open(algorithm, &data_key, &envelope.iv, &envelope.ciphertext)?;
        drop(data_key);

        debug!(%algorithm, "payload opened");
        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            ServiceError::from(CipherError::InvalidUtf8)
        })
    }
}

impl From<CipherError> for ServiceError {
    fn from(e: CipherError) -> Self {
        ServiceError::Cipher(e.to_string())
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, KeyServiceError>>,
) -> Result<T, KeyServiceError> {
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| KeyServiceError::DeadlineExceeded(deadline))?
}
