//! Concurrent batch resolution engine
//!
//! [`BatchResolver`] composes an explicit [`ResolverCache`] and
//! [`RetryPolicy`] around a caller-supplied fetch operation.

pub mod batch;
pub mod cache;
pub mod retry;

pub use batch::{BatchAbort, BatchOutput, BatchResolver, ItemOutcome};
pub use cache::{CachedOutcome, ResolverCache};
pub use retry::{Attempted, RetryPolicy};
