//! [`DataKey`]: in-memory plaintext form of a per-message data key.

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced when building a [`DataKey`].
#[derive(Debug, Error)]
pub enum DataKeyError {
    /// The key material has an unexpected length.
    #[error("data key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Plaintext data key, exactly [`KEY_LEN`] bytes.
///
/// Lives only for the duration of one operation. The buffer is overwritten
/// with zeroes on drop, and the type deliberately implements neither `Clone`
/// nor `Serialize`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Copy `bytes` into a new key.
    ///
    /// # Errors
    ///
    /// Returns [`DataKeyError::InvalidLength`] unless `bytes` is [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DataKeyError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| DataKeyError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Raw key bytes, for driving the cipher.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DataKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_length() {
        let key = DataKey::from_slice(&[0x42u8; KEY_LEN]).unwrap();
        assert_eq!(key.as_bytes(), &[0x42u8; KEY_LEN]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            DataKey::from_slice(&[0u8; 16]),
            Err(DataKeyError::InvalidLength(16))
        ));
        assert!(DataKey::from_slice(&[]).is_err());
    }

    #[test]
    fn redacted_in_debug() {
        let key = DataKey::from_slice(&[0xABu8; KEY_LEN]).unwrap();
        let dbg = format!("{key:?}");
        assert_eq!(dbg, "DataKey([REDACTED])");
    }

    #[test]
    fn zeroize_clears_buffer() {
        let mut key = DataKey::from_slice(&[0xFFu8; KEY_LEN]).unwrap();
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }
}
