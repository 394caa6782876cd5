//! Mock implementations for testing.
//!
//! Provides a scripted transport and invoice fixtures for unit testing
//! without a running invoice service.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Mock HTTP transport for testing.
///
/// Outcomes queued for a specific path are consumed first, then the shared
/// queue, one per request. Once both are empty the default response is
/// returned, or a 500 if none is set.
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    routes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    default_response: Mutex<Option<MockResponse>>,
}

type Outcome = Result<MockResponse, TransportError>;

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Request body.
    pub body: Option<Vec<u8>>,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

/// A mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockResponse {
    /// Creates a 200 JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status: 200,
            headers,
            body,
        }
    }

    /// Creates a 200 newline-delimited JSON response, one line per item.
    pub fn ndjson<T: serde::Serialize>(items: &[T]) -> Self {
        let mut body = Vec::new();
        for item in items {
            body.extend(serde_json::to_vec(item).unwrap_or_default());
            body.push(b'\n');
        }
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/x-ndjson".to_string());

        Self {
            status: 200,
            headers,
            body,
        }
    }

    /// Creates an empty response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Replaces the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            default_response: Mutex::new(None),
        }
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        lock(&self.outcomes).push_back(Ok(response));
    }

    /// Queues a 200 JSON response.
    pub fn queue_json<T: serde::Serialize>(&self, value: &T) {
        self.queue(MockResponse::json(value));
    }

    /// Queues an empty response with the given status.
    pub fn queue_status(&self, status: u16) {
        self.queue(MockResponse::status(status));
    }

    /// Queues a response served only for requests to `path`.
    pub fn queue_for(&self, path: impl Into<String>, response: MockResponse) {
        lock(&self.routes)
            .entry(path.into())
            .or_default()
            .push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn queue_failure(&self, error: TransportError) {
        lock(&self.outcomes).push_back(Err(error));
    }

    /// Sets the response used once the queue is empty.
    pub fn set_default(&self, response: MockResponse) {
        *lock(&self.default_response) = Some(response);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Clears recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns the number of requests made to `path`.
    pub fn request_count_for(&self, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    fn next_outcome(&self, path: &str) -> Outcome {
        let routed = lock(&self.routes)
            .get_mut(path)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = routed {
            return outcome;
        }
        if let Some(outcome) = lock(&self.outcomes).pop_front() {
            return outcome;
        }
        Ok(lock(&self.default_response)
            .clone()
            .unwrap_or_else(|| MockResponse::status(500)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let outcome = self.next_outcome(&request.path);
        lock(&self.requests).push(RecordedRequest {
            method: request.method,
            path: request.path,
            body: request.body,
            headers: request.headers,
        });

        let response = outcome?;
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("request_count", &self.request_count())
            .finish()
    }
}

/// Invoice fixtures.
pub mod fixtures {
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use crate::types::Invoice;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
    }

    /// An invoice with the given id, issued in early 2024.
    pub fn invoice(id: i64) -> Invoice {
        let day = u32::try_from(id.rem_euclid(28)).unwrap_or(0) + 1;
        Invoice::with_id(id, date(2024, 1, day), BigDecimal::from(id * 1000))
    }

    /// The four invoices served by a freshly seeded service.
    pub fn invoices() -> Vec<Invoice> {
        (1..=4).map(invoice).collect()
    }

    /// An invoice not yet persisted.
    pub fn new_invoice() -> Invoice {
        Invoice::new(date(2024, 3, 1), BigDecimal::from(250))
    }
}
