//! AEAD sealing and opening of payloads under a [`DataKey`].
//!
//! Two algorithms are understood, selected by the identifier carried in every
//! envelope:
//!
//! - `aes-256-gcm` (default): AES-256-GCM with a 128-bit IV.
//! - `aes-256-gcm-siv`: AES-256-GCM-SIV (RFC 8452) with a 96-bit nonce.
//!
//! Both append a 16-byte authentication tag to the ciphertext. Opening
//! verifies the tag; any change to ciphertext, tag, IV or key fails with
//! [`CipherError::AeadFailure`].

use std::str::FromStr;

use aes_gcm::{
    aead::{consts::U16, rand_core::RngCore, Aead, KeyInit, OsRng},
    aes::Aes256,
    AesGcm,
};
use aes_gcm_siv::Aes256GcmSiv;
use common::protocol::DEFAULT_ALGORITHM;
use thiserror::Error;

use super::key::DataKey;

/// AES-256-GCM parameterised with a 16-byte IV.
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The envelope names an algorithm this service does not implement.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The IV does not match the width required by the algorithm.
    #[error("invalid IV length for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        algorithm: Algorithm,
        expected: usize,
        actual: usize,
    },

    /// The key could not be loaded into the cipher.
    #[error("invalid data key length")]
    InvalidKeyLength,

    /// Sealing failed, or opening failed tag verification (wrong key, tampered
    /// or truncated data).
    #[error("aead operation failed")]
    AeadFailure,

    /// The decrypted bytes are not valid UTF-8 text.
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

/// Symmetric algorithm used for the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    #[default]
    Aes256Gcm,
    Aes256GcmSiv,
}

impl Algorithm {
    /// Wire identifier carried in the envelope.
    pub fn id(self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => DEFAULT_ALGORITHM,
            Algorithm::Aes256GcmSiv => "aes-256-gcm-siv",
        }
    }

    /// Required IV width in bytes.
    pub fn iv_len(self) -> usize {
        match self {
            Algorithm::Aes256Gcm => 16,
            Algorithm::Aes256GcmSiv => 12,
        }
    }

    fn check_iv(self, iv: &[u8]) -> Result<(), CipherError> {
        if iv.len() != self.iv_len() {
            return Err(CipherError::InvalidIvLength {
                algorithm: self,
                expected: self.iv_len(),
                actual: iv.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Algorithm {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" => Ok(Algorithm::Aes256Gcm),
            "aes-256-gcm-siv" => Ok(Algorithm::Aes256GcmSiv),
            _ => Err(CipherError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

/// Generate a fresh random IV for `algorithm` from the OS CSPRNG.
pub fn generate_iv(algorithm: Algorithm) -> Vec<u8> {
    let mut iv = vec![0u8; algorithm.iv_len()];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext`, returning `ciphertext || tag`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidIvLength`] if `iv` has the wrong width, or
/// [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(
    algorithm: Algorithm,
    key: &DataKey,
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    algorithm.check_iv(iv)?;
    match algorithm {
        Algorithm::Aes256Gcm => Aes256Gcm128::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::InvalidKeyLength)?
            .encrypt(aes_gcm::Nonce::<U16>::from_slice(iv), plaintext)
            .map_err(|_| CipherError::AeadFailure),
        Algorithm::Aes256GcmSiv => Aes256GcmSiv::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::InvalidKeyLength)?
            .encrypt(aes_gcm_siv::Nonce::from_slice(iv), plaintext)
            .map_err(|_| CipherError::AeadFailure),
    }
}

/// Decrypt `ciphertext || tag` and verify the tag.
///
/// # Errors
///
/// Returns [`CipherError::InvalidIvLength`] if `iv` has the wrong width, or
/// [`CipherError::AeadFailure`] if authentication fails.
pub fn open(
    algorithm: Algorithm,
    key: &DataKey,
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    algorithm.check_iv(iv)?;
    if ciphertext.len() < TAG_LEN {
        return Err(CipherError::AeadFailure);
    }
    match algorithm {
        Algorithm::Aes256Gcm => Aes256Gcm128::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::InvalidKeyLength)?
            .decrypt(aes_gcm::Nonce::<U16>::from_slice(iv), ciphertext)
            .map_err(|_| CipherError::AeadFailure),
        Algorithm::Aes256GcmSiv => Aes256GcmSiv::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::InvalidKeyLength)?
            .decrypt(aes_gcm_siv::Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CipherError::AeadFailure),
    }
}
