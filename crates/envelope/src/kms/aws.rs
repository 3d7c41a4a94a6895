//! [`KeyService`] backed by AWS KMS.

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::{
    config::Region,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::Blob,
    types::DataKeySpec,
    Client,
};
use tracing::debug;
use zeroize::Zeroize;

use super::{DataKeyPair, KeyService, KeyServiceError, KeySpec};
use crate::crypto::DataKey;

/// Error code KMS uses when IAM or the key policy rejects the caller.
const ACCESS_DENIED_CODE: &str = "AccessDeniedException";

/// AWS KMS client wrapper. Cheap to clone; built once per process.
#[derive(Clone, Debug)]
pub struct AwsKms {
    client: Client,
}

impl AwsKms {
    /// Wrap an existing SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a KMS client for `region`, optionally pointed at `endpoint_url`
    /// (e.g. LocalStack). Credentials come from the standard AWS chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK config cannot be loaded.
    pub async fn init(region: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;

        let mut builder = aws_sdk_kms::config::Builder::from(&sdk_config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }

        Ok(Self::new(Client::from_conf(builder.build())))
    }
}

impl From<KeySpec> for DataKeySpec {
    fn from(spec: KeySpec) -> Self {
        match spec {
            KeySpec::Aes256 => DataKeySpec::Aes256,
        }
    }
}

#[async_trait]
impl KeyService for AwsKms {
    async fn generate_data_key(
        &self,
        master_key_id: &str,
        spec: KeySpec,
    ) -> Result<DataKeyPair, KeyServiceError> {
        debug!("calling KMS GenerateDataKey");
        let output = self
            .client
            .generate_data_key()
            .key_id(master_key_id)
            .key_spec(spec.into())
            .send()
            .await
            .map_err(classify)?;

        let (Some(plaintext), Some(wrapped)) = (output.plaintext, output.ciphertext_blob) else {
            return Err(KeyServiceError::NoKeyMaterial);
        };

        Ok(DataKeyPair {
            plaintext: take_key(plaintext)?,
            wrapped: wrapped.into_inner(),
        })
    }

    async fn unwrap_key(&self, wrapped: &[u8]) -> Result<DataKey, KeyServiceError> {
        debug!("calling KMS Decrypt");
        let output = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(wrapped))
            .send()
            .await
            .map_err(classify)?;

        let plaintext = output.plaintext.ok_or(KeyServiceError::NoKeyMaterial)?;
        take_key(plaintext)
    }
}

/// Copy a plaintext key blob into a [`DataKey`] and wipe the SDK's buffer.
fn take_key(blob: Blob) -> Result<DataKey, KeyServiceError> {
    let mut raw = blob.into_inner();
    let key = DataKey::from_slice(&raw);
    raw.zeroize();
    Ok(key?)
}

fn classify<E, R>(err: SdkError<E, R>) -> KeyServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    classify_code(err.code(), err.message(), detail)
}

/// Map a KMS error code onto the [`KeyServiceError`] taxonomy.
///
/// `detail` is used when the error carries no code (transport failures).
fn classify_code(code: Option<&str>, message: Option<&str>, detail: String) -> KeyServiceError {
    match code {
        Some(ACCESS_DENIED_CODE) => {
            KeyServiceError::AccessDenied(message.unwrap_or(ACCESS_DENIED_CODE).to_owned())
        }
        Some(code) => KeyServiceError::Failure(match message {
            Some(m) => format!("{code}: {m}"),
            None => code.to_owned(),
        }),
        None => KeyServiceError::Failure(detail),
    }
}
