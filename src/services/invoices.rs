//! Invoices service.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::errors::{InvoiceError, InvoiceResult};
use crate::observability::MetricsCollector;
use crate::resilience::classifier::{empty_body, json_body, json_list_body};
use crate::resilience::{ResilientInvoker, RetryMode, RetryPolicy};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::Invoice;

/// Collection path of the invoice resource.
pub const INVOICES_PATH: &str = "/invoices";

const JSON: &str = "application/json";

/// `Accept` value for listings, which may stream newline-delimited JSON.
const LIST_ACCEPT: &str = "application/x-ndjson, application/json";

/// The operations exposed by [`InvoiceService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceOperation {
    /// `GET /invoices`
    FindAll,
    /// `GET /invoices/{id}`
    FindById,
    /// `POST /invoices`
    Create,
    /// `PUT /invoices/{id}`
    Update,
    /// `DELETE /invoices/{id}`
    Delete,
}

impl InvoiceOperation {
    /// Name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            InvoiceOperation::FindAll => "find_all",
            InvoiceOperation::FindById => "find_by_id",
            InvoiceOperation::Create => "create",
            InvoiceOperation::Update => "update",
            InvoiceOperation::Delete => "delete",
        }
    }

    /// Whether the operation is retried.
    ///
    /// Only reads are retried. Writes make a single attempt and surface the
    /// first classified error, including server errors. Creation is not
    /// idempotent; update and delete are, but are kept single-attempt to
    /// match the downstream contract this client was written against.
    pub fn retry_mode(&self) -> RetryMode {
        match self {
            InvoiceOperation::FindAll | InvoiceOperation::FindById => RetryMode::Enabled,
            InvoiceOperation::Create | InvoiceOperation::Update | InvoiceOperation::Delete => {
                RetryMode::Disabled
            }
        }
    }
}

/// Service for reading and writing invoices on the downstream service.
pub struct InvoiceService {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    metrics: Arc<dyn MetricsCollector>,
    custom_headers: Vec<(String, String)>,
}

impl InvoiceService {
    /// Creates a new invoices service.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        policy: RetryPolicy,
        metrics: Arc<dyn MetricsCollector>,
        custom_headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            transport,
            policy,
            metrics,
            custom_headers,
        }
    }

    /// Lists all invoices in the order the service returns them.
    ///
    /// The service may answer with a JSON array or with newline-delimited
    /// JSON (`application/x-ndjson`).
    pub async fn find_all(&self) -> InvoiceResult<Vec<Invoice>> {
        self.find_all_with_cancel(CancellationToken::new()).await
    }

    /// Lists all invoices, giving up when `cancel` fires.
    #[instrument(skip(self, cancel))]
    pub async fn find_all_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> InvoiceResult<Vec<Invoice>> {
        let request = self.build_request(HttpRequest::get(INVOICES_PATH), LIST_ACCEPT);

        self.invoke(InvoiceOperation::FindAll, request, json_list_body, cancel)
            .await
    }

    /// Gets a single invoice.
    pub async fn find_by_id(&self, id: i64) -> InvoiceResult<Invoice> {
        self.find_by_id_with_cancel(id, CancellationToken::new()).await
    }

    /// Gets a single invoice, giving up when `cancel` fires.
    #[instrument(skip(self, cancel))]
    pub async fn find_by_id_with_cancel(
        &self,
        id: i64,
        cancel: CancellationToken,
    ) -> InvoiceResult<Invoice> {
        validate_id(id)?;
        let request = self.build_request(HttpRequest::get(item_path(id)), JSON);

        self.invoke(InvoiceOperation::FindById, request, json_body, cancel)
            .await
    }

    /// Creates an invoice and returns it with its server-assigned id.
    pub async fn create(&self, invoice: &Invoice) -> InvoiceResult<Invoice> {
        self.create_with_cancel(invoice, CancellationToken::new()).await
    }

    /// Creates an invoice, giving up when `cancel` fires.
    #[instrument(skip(self, invoice, cancel), fields(issued = %invoice.issued))]
    pub async fn create_with_cancel(
        &self,
        invoice: &Invoice,
        cancel: CancellationToken,
    ) -> InvoiceResult<Invoice> {
        invoice.validate()?;
        let body = serde_json::to_vec(invoice)?;
        let request = self.build_request(HttpRequest::post(INVOICES_PATH).with_body(body), JSON);

        self.invoke(InvoiceOperation::Create, request, json_body, cancel)
            .await
    }

    /// Replaces the invoice stored under `id`.
    pub async fn update(&self, id: i64, invoice: &Invoice) -> InvoiceResult<Invoice> {
        self.update_with_cancel(id, invoice, CancellationToken::new())
            .await
    }

    /// Replaces the invoice stored under `id`, giving up when `cancel` fires.
    #[instrument(skip(self, invoice, cancel))]
    pub async fn update_with_cancel(
        &self,
        id: i64,
        invoice: &Invoice,
        cancel: CancellationToken,
    ) -> InvoiceResult<Invoice> {
        validate_id(id)?;
        invoice.validate()?;
        let body = serde_json::to_vec(invoice)?;
        let request = self.build_request(HttpRequest::put(item_path(id)).with_body(body), JSON);

        self.invoke(InvoiceOperation::Update, request, json_body, cancel)
            .await
    }

    /// Deletes the invoice stored under `id`.
    pub async fn delete(&self, id: i64) -> InvoiceResult<()> {
        self.delete_with_cancel(id, CancellationToken::new()).await
    }

    /// Deletes the invoice stored under `id`, giving up when `cancel` fires.
    #[instrument(skip(self, cancel))]
    pub async fn delete_with_cancel(
        &self,
        id: i64,
        cancel: CancellationToken,
    ) -> InvoiceResult<()> {
        validate_id(id)?;
        let request = self.build_request(HttpRequest::delete(item_path(id)), JSON);

        self.invoke(InvoiceOperation::Delete, request, empty_body, cancel)
            .await
    }

    async fn invoke<T, D>(
        &self,
        operation: InvoiceOperation,
        request: HttpRequest,
        decode: D,
        cancel: CancellationToken,
    ) -> InvoiceResult<T>
    where
        D: Fn(&HttpResponse) -> InvoiceResult<T>,
    {
        let policy = self.policy.clone();
        let invoker = ResilientInvoker::new(operation.name(), policy, operation.retry_mode())
            .with_cancellation(cancel)
            .with_metrics(Arc::clone(&self.metrics));

        invoker
            .execute(
                || {
                    let transport = Arc::clone(&self.transport);
                    let req = request.clone();
                    async move { transport.send(req).await }
                },
                decode,
            )
            .await
    }

    fn build_request(&self, request: HttpRequest, accept: &str) -> HttpRequest {
        let mut request = request.with_header("Accept", accept);
        if request.body.is_some() {
            request = request.with_header("Content-Type", JSON);
        }
        for (name, value) in &self.custom_headers {
            request = request.with_header(name.clone(), value.clone());
        }
        request
    }
}

impl std::fmt::Debug for InvoiceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceService")
            .field("policy", &self.policy)
            .finish()
    }
}

fn item_path(id: i64) -> String {
    format!("{}/{}", INVOICES_PATH, id)
}

fn validate_id(id: i64) -> InvoiceResult<()> {
    if id <= 0 {
        return Err(InvoiceError::client(
            format!("Invoice id must be positive, got {}", id),
            400,
        ));
    }
    Ok(())
}
