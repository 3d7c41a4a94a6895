//! In-process [`KeyService`] for tests.
//!
//! Wraps data keys with AES-256-GCM-SIV under a random master key held in
//! memory. Wrapped form: `nonce[12] || ciphertext || tag[16]`.

use std::sync::atomic::{AtomicUsize, Ordering};

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use async_trait::async_trait;
use zeroize::Zeroize;

use super::{DataKeyPair, KeyService, KeyServiceError, KeySpec};
use crate::crypto::{DataKey, KEY_LEN};

const NONCE_LEN: usize = 12;

pub struct StaticKeyService {
    master_key_id: String,
    master: Aes256GcmSiv,
    deny_unwrap: bool,
    calls: AtomicUsize,
}

impl StaticKeyService {
    pub fn new(master_key_id: &str) -> Self {
        let mut master = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut master);
        Self {
            master_key_id: master_key_id.to_owned(),
            master: Aes256GcmSiv::new_from_slice(&master).unwrap(),
            deny_unwrap: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Refuse every unwrap as if the caller lacked `kms:Decrypt`.
    pub fn denying_unwrap(mut self) -> Self {
        self.deny_unwrap = true;
        self
    }

    /// Number of remote calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyService for StaticKeyService {
    async fn generate_data_key(
        &self,
        master_key_id: &str,
        _spec: KeySpec,
    ) -> Result<DataKeyPair, KeyServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if master_key_id != self.master_key_id {
            return Err(KeyServiceError::Failure(format!(
                "NotFoundException: key '{master_key_id}' does not exist"
            )));
        }

        let mut raw = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut raw);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = self
            .master
            .encrypt(Nonce::from_slice(&nonce), raw.as_ref())
            .map_err(|_| KeyServiceError::Failure("wrap failed".into()))?;
        let plaintext = DataKey::from_slice(&raw)?;
        raw.zeroize();

        let mut wrapped = nonce.to_vec();
        wrapped.extend_from_slice(&sealed);
        Ok(DataKeyPair { plaintext, wrapped })
    }

    async fn unwrap_key(&self, wrapped: &[u8]) -> Result<DataKey, KeyServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_unwrap {
            return Err(KeyServiceError::AccessDenied(
                "User is not authorized to perform kms:Decrypt".into(),
            ));
        }
        if wrapped.len() <= NONCE_LEN {
            return Err(KeyServiceError::Failure("InvalidCiphertextException".into()));
        }
        let (nonce, sealed) = wrapped.split_at(NONCE_LEN);
        let mut raw = self
            .master
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| KeyServiceError::Failure("InvalidCiphertextException".into()))?;
        let key = DataKey::from_slice(&raw);
        raw.zeroize();
        Ok(key?)
    }
}
