//! Resilient invoker.
//!
//! Runs one logical operation: issue the transport call, classify the
//! result, consult the retry policy, wait, repeat. Each invoker is built for
//! a single invocation and consumed by [`ResilientInvoker::execute`].

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::classifier::classify;
use super::retry::{RetryDecision, RetryPolicy};
use crate::errors::{InvoiceError, InvoiceResult};
use crate::observability::MetricsCollector;
use crate::transport::{HttpResponse, TransportError};

/// Whether an operation goes through the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Server errors are retried with backoff and become `Unavailable` once
    /// the budget is spent.
    Enabled,
    /// One attempt only; the first classified error is returned as is.
    Disabled,
}

/// Executes a single logical operation with classification and retries.
pub struct ResilientInvoker {
    operation: &'static str,
    policy: RetryPolicy,
    mode: RetryMode,
    cancel: CancellationToken,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl ResilientInvoker {
    /// Creates an invoker for `operation` (used in logs and metrics).
    pub fn new(operation: &'static str, policy: RetryPolicy, mode: RetryMode) -> Self {
        Self {
            operation,
            policy,
            mode,
            cancel: CancellationToken::new(),
            metrics: None,
        }
    }

    /// Stops the invocation as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Reports attempts, retries and outcomes to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs the operation until it succeeds, fails terminally, or is cancelled.
    ///
    /// `call` performs one transport attempt and is invoked once per attempt.
    /// `decode` turns a 2xx response into the success value.
    pub async fn execute<F, Fut, D, T>(self, mut call: F, decode: D) -> InvoiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse, TransportError>>,
        D: Fn(&HttpResponse) -> InvoiceResult<T>,
    {
        let mut state = self.policy.start();
        self.observe(|m| m.record_operation(self.operation));

        loop {
            state.record_attempt();
            self.observe(|m| m.record_attempt(self.operation));

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.finish(Err(InvoiceError::Cancelled)),
                outcome = call() => outcome,
            };

            let error = match classify(outcome, &decode) {
                Ok(value) => return self.finish(Ok(value)),
                Err(error) => error,
            };

            if self.mode == RetryMode::Disabled {
                return self.finish(Err(error));
            }

            let delay = match self.policy.next(&mut state, error) {
                RetryDecision::Retry { delay } => delay,
                RetryDecision::Stop(error) => {
                    if matches!(error, InvoiceError::Unavailable { .. }) {
                        tracing::warn!(
                            operation = self.operation,
                            attempts = state.attempts(),
                            max_attempts = self.policy.config().max_attempts(),
                            "Retry budget exhausted"
                        );
                    }
                    return self.finish(Err(error));
                }
            };

            tracing::debug!(
                operation = self.operation,
                attempt = state.attempts(),
                retry = state.retries(),
                delay_ms = delay.as_millis() as u64,
                "Scheduling retry"
            );
            self.observe(|m| m.record_retry(self.operation));

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.finish(Err(InvoiceError::Cancelled)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn finish<T>(&self, result: InvoiceResult<T>) -> InvoiceResult<T> {
        match &result {
            Ok(_) => self.observe(|m| m.record_success(self.operation)),
            Err(error) => self.observe(|m| m.record_failure(self.operation, error.kind())),
        }
        result
    }

    fn observe(&self, f: impl FnOnce(&dyn MetricsCollector)) {
        if let Some(metrics) = &self.metrics {
            f(metrics.as_ref());
        }
    }
}

impl std::fmt::Debug for ResilientInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientInvoker")
            .field("operation", &self.operation)
            .field("policy", &self.policy)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::DefaultMetricsCollector;
    use crate::resilience::classifier::{empty_body, json_body};
    use crate::resilience::RetryConfig;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Replays a fixed script of outcomes, one per attempt.
    struct Script {
        outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        calls: AtomicU32,
    }

    impl Script {
        fn new(outcomes: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn next(&self) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn status(code: u16, body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: code,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    async fn run(
        invoker: ResilientInvoker,
        script: &Arc<Script>,
    ) -> InvoiceResult<serde_json::Value> {
        let script = Arc::clone(script);
        invoker
            .execute(
                move || {
                    let script = Arc::clone(&script);
                    async move { script.next() }
                },
                json_body,
            )
            .await
    }

    fn retrying() -> ResilientInvoker {
        ResilientInvoker::new("test", RetryPolicy::default(), RetryMode::Enabled)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_server_errors() {
        for failures in 0..=3usize {
            let mut outcomes: Vec<_> = (0..failures).map(|_| status(503, "")).collect();
            outcomes.push(status(200, r#"{"ok":true}"#));
            let script = Script::new(outcomes);

            let value = run(retrying(), &script).await.unwrap();

            assert_eq!(value["ok"], true);
            assert_eq!(script.calls() as usize, failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_server_errors_become_unavailable() {
        let script = Script::new((0..4).map(|_| status(503, "")).collect());

        let error = run(retrying(), &script).await.unwrap_err();

        assert_eq!(error, InvoiceError::retries_exhausted());
        assert_eq!(error.status_code(), Some(503));
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_two_four_eight_seconds() {
        let script = Script::new((0..4).map(|_| status(500, "")).collect());
        let start = Instant::now();

        let _ = run(retrying(), &script).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2 + 4 + 8));
        assert!(elapsed < Duration::from_secs(2 + 4 + 8) + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_returns_immediately() {
        let script = Script::new(vec![status(404, "")]);
        let start = Instant::now();

        let error = run(retrying(), &script).await.unwrap_err();

        assert_eq!(error, InvoiceError::client("Client error", 404));
        assert_eq!(script.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_are_retried() {
        let script = Script::new(vec![
            Err(TransportError::Connection {
                message: "connection refused".to_string(),
            }),
            status(200, "{}"),
        ]);

        assert!(run(retrying(), &script).await.is_ok());
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_mode_surfaces_first_server_error() {
        let script = Script::new(vec![status(500, ""), status(200, "{}")]);
        let invoker = ResilientInvoker::new("create", RetryPolicy::default(), RetryMode::Disabled);

        let error = run(invoker, &script).await.unwrap_err();

        assert_eq!(error, InvoiceError::server("Server error", 500));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_attempts() {
        let script = Script::new((0..4).map(|_| status(503, "")).collect());
        let token = CancellationToken::new();
        let invoker = retrying().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            token.cancel();
        });

        let error = run(invoker, &script).await.unwrap_err();
        canceller.await.unwrap();

        assert_eq!(error, InvoiceError::Cancelled);
        // First attempt at t=0, retry at t=2, cancelled while waiting 4s.
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_makes_no_attempt() {
        let script = Script::new(vec![status(200, "{}")]);
        let token = CancellationToken::new();
        token.cancel();

        let error = run(retrying().with_cancellation(token), &script).await.unwrap_err();

        assert_eq!(error, InvoiceError::Cancelled);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_slow_attempt() {
        let token = CancellationToken::new();
        let invoker = retrying().with_cancellation(token.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let result = invoker
            .execute(
                || async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    status(200, "")
                },
                empty_body,
            )
            .await;

        assert_eq!(result, Err(InvoiceError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_reported() {
        let metrics = Arc::new(DefaultMetricsCollector::new());
        let script = Script::new(vec![status(502, ""), status(200, "{}")]);
        let invoker = retrying().with_metrics(metrics.clone());

        run(invoker, &script).await.unwrap();

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.operations, 1);
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_budget() {
        let policy = RetryPolicy::new(RetryConfig::new().max_retries(1));
        let script = Script::new(vec![status(500, ""), status(500, "")]);

        let error = run(
            ResilientInvoker::new("test", policy, RetryMode::Enabled),
            &script,
        )
        .await
        .unwrap_err();

        assert_eq!(error, InvoiceError::retries_exhausted());
        assert_eq!(script.calls(), 2);
    }
}
