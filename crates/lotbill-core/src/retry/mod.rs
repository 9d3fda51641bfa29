//! Resilient invocation of outbound calls.

pub mod classify;
pub mod invoker;

pub use classify::{classify, parse_retry_after, ErrorKind, FailureSignal};
pub use invoker::{ResilientInvoker, RetryError, RetryOutcome, RetryPolicy};
