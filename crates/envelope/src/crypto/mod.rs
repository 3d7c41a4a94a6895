//! Symmetric cipher primitives and the data-key type.
//!
//! This module is intentionally free of AWS and HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! encryptedData = base64(ciphertext || tag[16])
//! iv            = base64(iv[16])   (aes-256-gcm)
//!               | base64(iv[12])   (aes-256-gcm-siv)
//! ```

pub mod cipher;
pub mod key;

pub use cipher::{Algorithm, CipherError};
pub use key::{DataKey, DataKeyError};
#[cfg(test)]
pub use key::KEY_LEN;
