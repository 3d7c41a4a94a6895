//! Envelope encryption: the [`EncryptionEnvelope`] data model and the
//! [`EnvelopeService`] that produces and consumes it.
//!
//! # Lifecycle
//!
//! 1. Encrypt asks the Key Service for a fresh data key, seals the payload
//!    under a fresh IV, drops the plaintext key, and returns the envelope.
//! 2. Decrypt asks the Key Service to unwrap the envelope's key (which
//!    re-checks the caller's authorization), then opens the payload.
//!
//! Both operations make exactly one remote call and hold no state between
//! invocations.

pub mod service;

pub use service::EnvelopeService;

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use common::{protocol::EncodedEnvelope, ServiceError};

/// Decoder accepting canonical base64 with or without padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The four values that travel together between encrypt and decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionEnvelope {
    /// Data key wrapped by the Key Service. Opaque.
    pub wrapped_data_key: Vec<u8>,
    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
    /// Initialization vector used for this ciphertext only.
    pub iv: Vec<u8>,
    /// Identifier of the cipher that produced `ciphertext`.
    pub algorithm: String,
}

impl EncryptionEnvelope {
    /// Encode for transport.
    pub fn encode(&self) -> EncodedEnvelope {
        EncodedEnvelope {
            encrypted_data_key: STANDARD.encode(&self.wrapped_data_key),
            encrypted_data: STANDARD.encode(&self.ciphertext),
            iv: STANDARD.encode(&self.iv),
            algorithm: self.algorithm.clone(),
        }
    }

    /// Decode a transport envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Structural`] naming the first field that is not
    /// valid base64.
    pub fn decode(encoded: &EncodedEnvelope) -> Result<Self, ServiceError> {
        let envelope = Self {
            wrapped_data_key: decode_field(&encoded.encrypted_data_key, "encryptedDataKey")?,
            ciphertext: decode_field(&encoded.encrypted_data, "encryptedData")?,
            iv: decode_field(&encoded.iv, "iv")?,
            algorithm: encoded.algorithm.clone(),
        };
        envelope.ensure_complete()?;
        Ok(envelope)
    }

    /// Check that the mandatory byte fields are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Structural`] listing the empty fields.
    pub fn ensure_complete(&self) -> Result<(), ServiceError> {
        let missing: Vec<&str> = [
            ("encryptedDataKey", self.wrapped_data_key.is_empty()),
            ("encryptedData", self.ciphertext.is_empty()),
            ("iv", self.iv.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, empty)| empty.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::structural(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

fn decode_field(value: &str, name: &str) -> Result<Vec<u8>, ServiceError> {
    LENIENT
        .decode(value.trim())
        .map_err(|_| ServiceError::structural(format!("{name} is not valid base64")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptionEnvelope {
        EncryptionEnvelope {
            wrapped_data_key: vec![1, 2, 3, 4],
            ciphertext: vec![9; 20],
            iv: vec![7; 16],
            algorithm: "aes-256-gcm".into(),
        }
    }

    #[test]
    fn encode_uses_padded_standard_base64() {
        let encoded = sample().encode();
        assert_eq!(encoded.encrypted_data_key, "AQIDBA==");
        assert_eq!(encoded.algorithm, "aes-256-gcm");
    }

    #[test]
    fn decode_accepts_unpadded_input() {
        let mut encoded = sample().encode();
        encoded.encrypted_data_key = "AQIDBA".into();
        assert_eq!(EncryptionEnvelope::decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn decode_rejects_invalid_base64_with_field_name() {
        let mut encoded = sample().encode();
        encoded.iv = "not*base64!".into();
        let err = EncryptionEnvelope::decode(&encoded).unwrap_err();
        assert!(matches!(err, ServiceError::Structural(_)));
        assert!(err.to_string().contains("iv"));
    }

    #[test]
    fn decode_rejects_non_canonical_trailing_bits() {
        let mut encoded = sample().encode();
        // Same bytes as "AQIDBA==" but with non-zero trailing bits.
        encoded.encrypted_data_key = "AQIDBB==".into();
        let err = EncryptionEnvelope::decode(&encoded).unwrap_err();
        assert!(matches!(err, ServiceError::Structural(_)));
        assert!(err.to_string().contains("encryptedDataKey"));
    }

    #[test]
    fn ensure_complete_lists_empty_fields() {
        let mut env = sample();
        env.iv.clear();
        env.ciphertext.clear();
        let msg = env.ensure_complete().unwrap_err().to_string();
        assert!(msg.contains("encryptedData"));
        assert!(msg.contains("iv"));
        assert!(!msg.contains("encryptedDataKey"));
    }
}
