//! Transport-agnostic entry points for the two operations.
//!
//! Each function accepts the raw request event in any of the shapes handled
//! by [`common::request`], runs the operation, and always returns an
//! [`InvocationResponse`]; no error escapes.
//!
//! Only metadata is logged: operation, request id, request shape, field
//! presence, and error classification.

use common::{
    protocol::{DecryptRequest, DecryptResponse, EncryptRequest, InvocationResponse, ResponseBody},
    request::{self, Normalised, Validate},
    ErrorKind, Operation, ServiceError,
};
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::envelope::{EncryptionEnvelope, EnvelopeService};

/// Run the encrypt operation for one request event.
pub async fn encrypt_event(service: &EnvelopeService, event: Value) -> InvocationResponse {
    encrypt_event_within(service, event, None).await
}

/// Run the decrypt operation for one request event.
pub async fn decrypt_event(service: &EnvelopeService, event: Value) -> InvocationResponse {
    decrypt_event_within(service, event, None).await
}

/// Like [`encrypt_event`], with a caller-supplied Key Service deadline.
///
/// The deadline can only shorten the service's configured one.
pub async fn encrypt_event_within(
    service: &EnvelopeService,
    event: Value,
    deadline: Option<Duration>,
) -> InvocationResponse {
    invoke(service, Operation::Encrypt, event, deadline).await
}

/// Like [`decrypt_event`], with a caller-supplied Key Service deadline.
///
/// The deadline can only shorten the service's configured one.
pub async fn decrypt_event_within(
    service: &EnvelopeService,
    event: Value,
    deadline: Option<Duration>,
) -> InvocationResponse {
    invoke(service, Operation::Decrypt, event, deadline).await
}

async fn invoke(
    service: &EnvelopeService,
    op: Operation,
    event: Value,
    deadline: Option<Duration>,
) -> InvocationResponse {
    let deadline = deadline.map_or(service.call_timeout(), |d| d.min(service.call_timeout()));
    let span = info_span!(
        "invocation",
        operation = op.as_str(),
        request_id = %Uuid::new_v4(),
    );
    async move {
        let result = match op {
            Operation::Encrypt => run_encrypt(service, event, deadline).await,
            Operation::Decrypt => run_decrypt(service, event, deadline).await,
        };
        match result {
            Ok(body) => {
                info!("{} successful", op.as_str());
                InvocationResponse::ok(body)
            }
            Err(e) => rejected(op, &e),
        }
    }
    .instrument(span)
    .await
}

/// Log `err` by classification and build its response.
pub fn rejected(op: Operation, err: &ServiceError) -> InvocationResponse {
    let kind = err.kind();
    match kind {
        ErrorKind::Structural | ErrorKind::AccessDenied => {
            warn!(operation = op.as_str(), kind = %kind, error = %err, "request rejected");
        }
        ErrorKind::KeyService | ErrorKind::Cipher => {
            error!(operation = op.as_str(), kind = %kind, error = %err, "request failed");
        }
    }
    InvocationResponse::failure(op, err)
}

async fn run_encrypt(
    service: &EnvelopeService,
    event: Value,
    deadline: Duration,
) -> Result<ResponseBody, ServiceError> {
    let Normalised { shape, request } = request::normalise::<EncryptRequest>(event)?;
    info!(
        shape = shape.as_str(),
        has_plaintext = request.plaintext.is_some(),
        "request normalised"
    );

    let mut plaintext = request.validate()?;
    let result = service.encrypt_within(&plaintext, deadline).await;
    plaintext.zeroize();

    Ok(ResponseBody::Encrypted(result?.encode()))
}

async fn run_decrypt(
    service: &EnvelopeService,
    event: Value,
    deadline: Duration,
) -> Result<ResponseBody, ServiceError> {
    let Normalised { shape, request } = request::normalise::<DecryptRequest>(event)?;
    info!(
        shape = shape.as_str(),
        has_encrypted_data_key = request.encrypted_data_key.is_some(),
        has_encrypted_data = request.encrypted_data.is_some(),
        has_iv = request.iv.is_some(),
        has_algorithm = request.algorithm.is_some(),
        has_request_user = request.request_user.is_some(),
        "request normalised"
    );

    let encoded = request.validate()?;
    let envelope = EncryptionEnvelope::decode(&encoded)?;
    let decrypted = service.decrypt_within(&envelope, deadline).await?;

    Ok(ResponseBody::Decrypted(DecryptResponse { decrypted }))
}
