//! Resilience helpers.
//!
//! # Design Decisions
//! - Every RPC call has a deadline (enforced in `blockchain::client`)
//! - Only idempotent work is retried: read-only queries, re-sending an
//!   identical signed payload, and receipt polling
//! - Jittered exponential backoff, always bounded by an attempt count

pub mod backoff;

pub use backoff::{calculate_backoff, BackoffPolicy};
