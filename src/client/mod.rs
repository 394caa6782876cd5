//! Invoice API client.
//!
//! Provides the main entry point for talking to the invoice service.

use std::sync::Arc;

use crate::config::{InvoiceConfig, InvoiceConfigBuilder};
use crate::errors::{InvoiceError, InvoiceResult};
use crate::observability::{DefaultMetricsCollector, MetricsCollector};
use crate::resilience::{RetryConfig, RetryPolicy};
use crate::services::InvoiceService;
use crate::transport::{HttpTransport, HttpTransportImpl};

/// The main invoice client.
///
/// # Example
///
/// ```rust,no_run
/// use invoice_client::InvoiceClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = InvoiceClient::builder()
///         .base_url("http://localhost:8080")
///         .build()?;
///
///     for invoice in client.invoices().find_all().await? {
///         println!("{:?} issued {} for {}", invoice.id, invoice.issued, invoice.total);
///     }
///     Ok(())
/// }
/// ```
pub struct InvoiceClient {
    config: InvoiceConfig,
    invoice_service: InvoiceService,
    metrics: Arc<dyn MetricsCollector>,
}

impl InvoiceClient {
    /// Creates a new client builder.
    pub fn builder() -> InvoiceClientBuilder {
        InvoiceClientBuilder::new()
    }

    /// Creates a client from environment variables.
    ///
    /// See [`InvoiceConfig::from_env`] for the variables read.
    pub fn from_env() -> InvoiceResult<Self> {
        let config = InvoiceConfig::from_env()?;
        InvoiceClientBuilder::from_config(config).build()
    }

    /// Returns the invoices service.
    pub fn invoices(&self) -> &InvoiceService {
        &self.invoice_service
    }

    /// Returns the configuration.
    pub fn config(&self) -> &InvoiceConfig {
        &self.config
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }
}

impl std::fmt::Debug for InvoiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for the invoice client.
pub struct InvoiceClientBuilder {
    config_builder: InvoiceConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl InvoiceClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config_builder: InvoiceConfigBuilder::new(),
            transport: None,
            metrics: None,
        }
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: InvoiceConfig) -> Self {
        let mut config_builder = InvoiceConfigBuilder::new()
            .base_url(config.base_url)
            .timeout(config.timeout)
            .retry(config.retry);
        for (name, value) in config.custom_headers {
            config_builder = config_builder.header(name, value);
        }

        Self {
            config_builder,
            transport: None,
            metrics: None,
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(base_url);
        self
    }

    /// Sets the per-call timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config_builder = self.config_builder.timeout_secs(secs);
        self
    }

    /// Sets the retry configuration used by read operations.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config_builder = self.config_builder.retry(retry);
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.header(name, value);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the client.
    pub fn build(self) -> InvoiceResult<InvoiceClient> {
        let config = self.config_builder.build()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransportImpl::new(&config.base_url, config.timeout)
                    .map_err(|e| InvoiceError::configuration(e.to_string()))?,
            ),
        };

        let metrics: Arc<dyn MetricsCollector> = self
            .metrics
            .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new()));

        let invoice_service = InvoiceService::new(
            transport,
            RetryPolicy::new(config.retry.clone()),
            Arc::clone(&metrics),
            config.custom_headers.clone(),
        );

        tracing::debug!(base_url = %config.base_url, "Invoice client initialized");

        Ok(InvoiceClient {
            config,
            invoice_service,
            metrics,
        })
    }
}

impl Default for InvoiceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
