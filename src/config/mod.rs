//! Configuration module for the invoice client.
//!
//! Holds the downstream base URL, the per-call timeout and the retry
//! settings shared (read-only) by every logical operation.

use std::time::Duration;
use url::Url;

use crate::errors::{InvoiceError, InvoiceResult};
use crate::resilience::RetryConfig;

/// Default base URL of the invoice service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default timeout for one transport call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the invoice client.
#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    /// Base URL for API requests, without a trailing slash.
    pub base_url: String,
    /// Timeout for a single transport call.
    pub timeout: Duration,
    /// Retry settings for operations that opt into retries.
    pub retry: RetryConfig,
    /// Custom headers to include in requests.
    pub custom_headers: Vec<(String, String)>,
}

impl InvoiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> InvoiceConfigBuilder {
        InvoiceConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `INVOICE_BASE_URL` (optional): Base URL of the invoice service
    /// - `INVOICE_TIMEOUT` (optional): Per-call timeout in seconds
    /// - `INVOICE_MAX_RETRIES` (optional): Maximum retry attempts, at most 3
    /// - `INVOICE_RETRY_DELAY_MS` (optional): Delay before the first retry,
    ///   at least 2000
    pub fn from_env() -> InvoiceResult<Self> {
        let mut builder = InvoiceConfigBuilder::new();

        if let Ok(base_url) = std::env::var("INVOICE_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Some(secs) = parse_env::<u64>("INVOICE_TIMEOUT")? {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let mut retry = RetryConfig::default();
        if let Some(retries) = parse_env::<u32>("INVOICE_MAX_RETRIES")? {
            retry = retry.max_retries(retries);
        }
        if let Some(delay_ms) = parse_env::<u64>("INVOICE_RETRY_DELAY_MS")? {
            retry = retry.initial_delay(Duration::from_millis(delay_ms));
        }

        builder.retry(retry).build()
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            custom_headers: Vec::new(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> InvoiceResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| {
                InvoiceError::configuration(format!("{} has an invalid value: {}", name, raw))
            }),
        Err(_) => Ok(None),
    }
}

/// Builder for `InvoiceConfig`.
#[derive(Debug, Default)]
pub struct InvoiceConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    custom_headers: Vec<(String, String)>,
}

impl InvoiceConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Adds a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> InvoiceResult<InvoiceConfig> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let parsed = Url::parse(&base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(InvoiceError::configuration(format!(
                "Base URL must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(InvoiceError::configuration("Timeout must be non-zero"));
        }

        let retry = self.retry.unwrap_or_default();
        retry.validate()?;

        Ok(InvoiceConfig {
            base_url,
            timeout,
            retry,
            custom_headers: self.custom_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder_defaults() {
        let config = InvoiceConfig::builder().build().unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builder_success() {
        let config = InvoiceConfig::builder()
            .base_url("https://billing.example.com/api/")
            .timeout_secs(5)
            .retry(RetryConfig::new().max_retries(1))
            .header("X-Tenant", "acme")
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://billing.example.com/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.custom_headers, vec![("X-Tenant".to_string(), "acme".to_string())]);
    }

    #[test]
    fn test_config_builder_invalid_base_url() {
        assert!(InvoiceConfig::builder().base_url("not a url").build().is_err());
        assert!(InvoiceConfig::builder()
            .base_url("ftp://files.example.com")
            .build()
            .is_err());
    }

    #[test]
    fn test_config_builder_rejects_zero_timeout() {
        let result = InvoiceConfig::builder().timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(InvoiceError::Configuration { .. })));
    }

    #[test]
    fn test_config_builder_rejects_retry_outside_contract() {
        let result = InvoiceConfig::builder()
            .retry(
                RetryConfig::new()
                    .initial_delay(Duration::from_millis(10))
                    .max_retries(10),
            )
            .build();
        assert!(matches!(result, Err(InvoiceError::Configuration { .. })));

        let result = InvoiceConfig::builder()
            .retry(RetryConfig::new().initial_delay(Duration::from_millis(500)))
            .build();
        assert!(matches!(result, Err(InvoiceError::Configuration { .. })));
    }

    #[test]
    fn test_config_builder_rejects_invalid_retry() {
        let result = InvoiceConfig::builder()
            .retry(RetryConfig::new().multiplier(0.5))
            .build();
        assert!(result.is_err());
    }
}
