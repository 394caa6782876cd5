//! Observability module for the invoice client.
//!
//! Structured logging goes through `tracing`; counters for operations,
//! attempts and retries go through a [`MetricsCollector`].

mod logging;
mod metrics;

pub use logging::{init_tracing, LogConfig, LogFormat, LogLevel};
pub use metrics::{DefaultMetricsCollector, InvoiceMetrics, MetricsCollector, NoopMetricsCollector};
