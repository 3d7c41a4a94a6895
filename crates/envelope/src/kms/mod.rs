//! Key Service boundary: data-key generation and unwrapping.
//!
//! The [`KeyService`] trait is the only way the rest of the crate talks to the
//! remote key-management system. [`AwsKms`] implements it over AWS KMS; tests
//! use the `mockall`-generated `MockKeyService` or the local
//! `fake::StaticKeyService`.
//!
//! # Security invariants
//!
//! - Plaintext data keys are returned only as [`DataKey`], which zeroises on
//!   drop and never prints its contents.
//! - Wrapped keys are opaque: they are passed through unchanged and never
//!   decoded locally.
//! - Authorization is decided solely by the Key Service.

pub mod aws;
#[cfg(test)]
pub mod fake;

pub use aws::AwsKms;

use std::time::Duration;

use async_trait::async_trait;
use common::ServiceError;
use thiserror::Error;

use crate::crypto::{DataKey, DataKeyError};

/// Key specification requested for new data keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// 256-bit symmetric key.
    Aes256,
}

/// A freshly generated data key in both of its forms.
#[derive(Debug)]
pub struct DataKeyPair {
    /// Plaintext key. Use once, then drop.
    pub plaintext: DataKey,
    /// The same key wrapped under the master key.
    pub wrapped: Vec<u8>,
}

/// Errors returned by a [`KeyService`].
#[derive(Debug, Error)]
pub enum KeyServiceError {
    /// The caller lacks permission on the master key.
    #[error("{0}")]
    AccessDenied(String),

    /// The remote call did not complete within the deadline.
    #[error("key service call exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The response carried no plaintext or wrapped key.
    #[error("key service returned no key material")]
    NoKeyMaterial,

    /// The returned plaintext key is unusable.
    #[error(transparent)]
    InvalidKey(#[from] DataKeyError),

    /// Any other failure: unreachable, disabled key, malformed wrapped key.
    #[error("{0}")]
    Failure(String),
}

impl From<KeyServiceError> for ServiceError {
    fn from(e: KeyServiceError) -> Self {
        match e {
            KeyServiceError::AccessDenied(msg) => ServiceError::AccessDenied(msg),
            other => ServiceError::KeyService(other.to_string()),
        }
    }
}

/// Remote, access-controlled key-management capability.
///
/// Implementations hold no per-request state and are shared across
/// concurrent invocations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Generate a new data key under `master_key_id`.
    async fn generate_data_key(
        &self,
        master_key_id: &str,
        spec: KeySpec,
    ) -> Result<DataKeyPair, KeyServiceError>;

    /// Recover the plaintext form of a wrapped data key.
    async fn unwrap_key(&self, wrapped: &[u8]) -> Result<DataKey, KeyServiceError>;
}
