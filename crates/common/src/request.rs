//! Normalisation of the polymorphic request shapes accepted by both operations.
//!
//! A request can reach the service in three shapes depending on the transport:
//!
//! | Shape         | Example                                   |
//! |---------------|-------------------------------------------|
//! | `json_string` | `"{\"plaintext\":\"hi\"}"`                |
//! | `nested_body` | `{"body": "{\"plaintext\":\"hi\"}"}`      |
//! | `raw`         | `{"plaintext": "hi"}`                     |
//!
//! Shapes are tried in exactly that priority order. The selected shape is
//! parsed once into a JSON object, deserialised into the operation's wire
//! request, and finally checked with [`Validate`]. Every failure is a
//! [`ServiceError::Structural`] and happens before any remote call.

use serde::de::DeserializeOwned;
use serde_json::{error::Category, Map, Value};

use crate::error::ServiceError;
use crate::protocol::{DecryptRequest, EncodedEnvelope, EncryptRequest, DEFAULT_ALGORITHM};

/// Which shape an incoming request was delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Raw,
    JsonString,
    NestedBody,
}

impl ShapeKind {
    /// Label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Raw => "raw",
            ShapeKind::JsonString => "json_string",
            ShapeKind::NestedBody => "nested_body",
        }
    }
}

/// A request event classified by shape but not yet parsed.
pub enum RequestShape {
    /// The event is itself a JSON object.
    Raw(Map<String, Value>),
    /// The event is a string holding a JSON document.
    JsonString(String),
    /// The event is an object whose `body` property is a JSON document string.
    NestedBody(String),
}

// Payload text is never printed, only the variant.
impl std::fmt::Debug for RequestShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RequestShape::{}", self.kind().as_str())
    }
}

impl RequestShape {
    /// Classify `event`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Structural`] for `null`, numbers, booleans and
    /// arrays.
    pub fn detect(event: Value) -> Result<Self, ServiceError> {
        match event {
            Value::String(s) => Ok(RequestShape::JsonString(s)),
            Value::Object(mut map) => match map.remove("body") {
                Some(Value::String(body)) => Ok(RequestShape::NestedBody(body)),
                Some(other) => {
                    map.insert("body".to_owned(), other);
                    Ok(RequestShape::Raw(map))
                }
                None => Ok(RequestShape::Raw(map)),
            },
            other => Err(ServiceError::structural(format!(
                "unsupported request shape: {}",
                json_type(&other)
            ))),
        }
    }

    /// The shape label, without the payload.
    pub fn kind(&self) -> ShapeKind {
        match self {
            RequestShape::Raw(_) => ShapeKind::Raw,
            RequestShape::JsonString(_) => ShapeKind::JsonString,
            RequestShape::NestedBody(_) => ShapeKind::NestedBody,
        }
    }

    /// Parse the shape into a JSON object.
    fn into_object(self) -> Result<Map<String, Value>, ServiceError> {
        let text = match self {
            RequestShape::Raw(map) => return Ok(map),
            RequestShape::JsonString(s) | RequestShape::NestedBody(s) => s,
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ServiceError::structural(format!(
                "request document must be a JSON object, got {}",
                json_type(&other)
            ))),
            Err(e) => Err(ServiceError::structural(describe(&e))),
        }
    }
}

/// A request after shape detection and deserialisation.
#[derive(Debug)]
pub struct Normalised<T> {
    pub shape: ShapeKind,
    pub request: T,
}

/// Detect the shape of `event`, parse it once, and deserialise it into `T`.
///
/// # Errors
///
/// Returns [`ServiceError::Structural`] if no shape matches, the embedded
/// document is not a JSON object, or a field has the wrong type.
pub fn normalise<T: DeserializeOwned>(event: Value) -> Result<Normalised<T>, ServiceError> {
    let shape = RequestShape::detect(event)?;
    let kind = shape.kind();
    let object = shape.into_object()?;
    let request = serde_json::from_value(Value::Object(object))
        .map_err(|e| ServiceError::structural(describe(&e)))?;
    Ok(Normalised {
        shape: kind,
        request,
    })
}

/// Required-field validation, turning a wire request into an operation input.
pub trait Validate: Sized {
    type Output;

    /// # Errors
    ///
    /// Returns [`ServiceError::Structural`] naming the missing fields.
    fn validate(self) -> Result<Self::Output, ServiceError>;
}

impl Validate for EncryptRequest {
    type Output = String;

    fn validate(self) -> Result<String, ServiceError> {
        match self.plaintext {
            None => Err(ServiceError::structural("plaintext is required")),
            Some(p) if p.is_empty() => Err(ServiceError::structural("plaintext cannot be empty")),
            Some(p) => Ok(p),
        }
    }
}

impl Validate for DecryptRequest {
    type Output = EncodedEnvelope;

    fn validate(self) -> Result<EncodedEnvelope, ServiceError> {
        let mut missing = Vec::new();
        let encrypted_data_key = present(self.encrypted_data_key, "encryptedDataKey", &mut missing);
        let encrypted_data = present(self.encrypted_data, "encryptedData", &mut missing);
        let iv = present(self.iv, "iv", &mut missing);

        match (encrypted_data_key, encrypted_data, iv) {
            (Some(encrypted_data_key), Some(encrypted_data), Some(iv)) => Ok(EncodedEnvelope {
                encrypted_data_key,
                encrypted_data,
                iv,
                algorithm: self
                    .algorithm
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ALGORITHM.to_owned()),
            }),
            _ => Err(ServiceError::structural(format!(
                "missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

fn present(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

/// Describe a serde error without echoing any request content.
fn describe(err: &serde_json::Error) -> String {
    match err.classify() {
        Category::Syntax | Category::Eof => format!(
            "request is not valid JSON (line {}, column {})",
            err.line(),
            err.column()
        ),
        Category::Data => "request field has an unexpected type".to_owned(),
        Category::Io => "request could not be read".to_owned(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
