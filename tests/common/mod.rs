//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use invoice_client::{InvoiceClient, RetryConfig};
use serde_json::{json, Value};
use wiremock::MockServer;

/// Retry settings with the real 2 s first delay but a single retry.
///
/// Used where the size of the budget is not under test, to keep the wall
/// clock cost of a failing read at one backoff.
pub fn single_retry() -> RetryConfig {
    RetryConfig::new().max_retries(1)
}

/// Builds a client pointed at `server` with the default retry budget.
pub fn client_for(server: &MockServer) -> InvoiceClient {
    client_with(&server.uri(), RetryConfig::default())
}

/// Builds a client for `base_url` with the given retry settings.
pub fn client_with(base_url: &str, retry: RetryConfig) -> InvoiceClient {
    InvoiceClient::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(2))
        .retry(retry)
        .build()
        .expect("client should build")
}

/// One invoice as the service encodes it.
pub fn invoice_json(id: i64) -> Value {
    json!({
        "id": id,
        "issued": format!("2024-01-{:02}", id + 1),
        "total": id * 1000,
    })
}

/// The four invoices of a freshly seeded service.
pub fn seeded_invoices() -> Value {
    Value::Array((1..=4).map(invoice_json).collect())
}
