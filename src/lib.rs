//! Invoice Client Library
//!
//! A Rust client for a remote invoice service. Every HTTP outcome is turned
//! into a typed result: a decoded value, a client error (4xx), a server error
//! (5xx or no response), or a service-unavailable error once the bounded
//! retry budget of a read operation is spent.
//!
//! # Features
//!
//! - **Classification**: 4xx, 5xx and transport failures map to distinct error kinds
//! - **Bounded retries**: Reads retry server errors with exponential backoff (2s, 4s, 8s)
//! - **Single-shot writes**: Create, update and delete never retry
//! - **Cancellation**: Every operation has a variant that honours a `CancellationToken`
//! - **Observability**: `tracing` spans and events plus a metrics collector
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use invoice_client::InvoiceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = InvoiceClient::builder()
//!         .base_url("http://localhost:8080")
//!         .build()?;
//!
//!     let invoice = client.invoices().find_by_id(1).await?;
//!     println!("{} issued on {}", invoice.total, invoice.issued);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use invoice_client::{InvoiceClient, InvoiceError};
//!
//! # async fn run(client: InvoiceClient) {
//! match client.invoices().find_all().await {
//!     Ok(invoices) => println!("{} invoices", invoices.len()),
//!     Err(InvoiceError::Unavailable { .. }) => eprintln!("service down, try later"),
//!     Err(e) => eprintln!("{} -> {:?}", e, e.to_error_data()),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;
pub mod observability;
pub mod resilience;
pub mod services;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use client::{InvoiceClient, InvoiceClientBuilder};
pub use config::{InvoiceConfig, InvoiceConfigBuilder};
pub use errors::{ErrorData, InvoiceError, InvoiceResult};
pub use observability::{init_tracing, DefaultMetricsCollector, LogConfig, MetricsCollector};
pub use resilience::{ResilientInvoker, RetryConfig, RetryMode, RetryPolicy};
pub use services::{InvoiceOperation, InvoiceService};
pub use transport::{HttpTransport, TransportError};
pub use types::Invoice;

/// Re-export of the cancellation token accepted by the `*_with_cancel` operations.
pub use tokio_util::sync::CancellationToken;
