//! Configuration loading and validation for the envelope service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::Algorithm;
use crate::server::middleware::REQUEST_TIMEOUT;

/// Validated envelope service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Master key id, ARN or alias used for GenerateDataKey. **Required.**
    pub kms_key_id: String,

    /// AWS region of the KMS endpoint.
    #[serde(default = "default_aws_region")]
    pub aws_region: String,

    /// Override for the KMS endpoint (e.g. LocalStack).
    #[serde(default)]
    pub kms_endpoint_url: Option<String>,

    /// Deadline (milliseconds) for each remote Key Service call.
    #[serde(default = "default_kms_timeout_ms")]
    pub kms_timeout_ms: u64,

    /// Cipher used for new encryptions.
    #[serde(default = "default_cipher_algorithm")]
    pub cipher_algorithm: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_aws_region() -> String {
    "ap-northeast-2".into()
}
fn default_kms_timeout_ms() -> u64 {
    5000
}
fn default_cipher_algorithm() -> String {
    Algorithm::default().id().into()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let mut c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.kms_endpoint_url = non_empty(c.kms_endpoint_url.take());
        c.otel_exporter_otlp_endpoint = non_empty(c.otel_exporter_otlp_endpoint.take());
        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.kms_key_id, "KMS_KEY_ID")?;
        ensure_non_empty(&self.aws_region, "AWS_REGION")?;

        if self.kms_timeout_ms == 0 {
            anyhow::bail!("KMS_TIMEOUT_MS must be > 0");
        }
        if self.kms_timeout() >= REQUEST_TIMEOUT {
            anyhow::bail!(
                "KMS_TIMEOUT_MS must be below the {} ms request timeout",
                REQUEST_TIMEOUT.as_millis()
            );
        }
        self.algorithm()?;
        Ok(())
    }

    /// The configured encryption algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if `CIPHER_ALGORITHM` names an unsupported cipher.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.cipher_algorithm
            .parse()
            .with_context(|| format!("CIPHER_ALGORITHM '{}' is not supported", self.cipher_algorithm))
    }

    /// Per-call Key Service deadline.
    pub fn kms_timeout(&self) -> Duration {
        Duration::from_millis(self.kms_timeout_ms)
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
