//! Resilience layer for the invoice client.
//!
//! Three independently testable pieces combined by the invoker:
//!
//! - [`classifier`]: one transport result to a value or a classified error,
//! - [`RetryPolicy`]: one classified error to "retry after D" or "stop",
//! - [`ResilientInvoker`]: the loop that drives both for a logical operation.

pub mod classifier;
mod invoker;
mod retry;

pub use classifier::{classify, StatusClass};
pub use invoker::{ResilientInvoker, RetryMode};
pub use retry::{
    RetryConfig, RetryDecision, RetryPolicy, RetryState, DEFAULT_INITIAL_DELAY,
    DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_MULTIPLIER, JITTER_FACTOR,
};
