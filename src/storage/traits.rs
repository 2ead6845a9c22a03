//! Storage traits and error types
//!
//! This module defines the interface the pipeline needs from the key-value
//! store: a connection factory and the per-connection ledger operations.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during store operations
///
/// A missing key is not an error; lookups return `false` for it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable")]
    Unavailable,

    #[error("Store state poisoned")]
    Poisoned,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The two dedup namespaces of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Archive links that have been downloaded and fully processed
    Downloaded,
    /// Entry names that have been pushed to the output queue
    Processed,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded => write!(f, "downloaded"),
            Self::Processed => write!(f, "processed"),
        }
    }
}

/// Ledger operations on one store connection
///
/// A value is "marked" when the namespace holds a non-empty value for the key.
/// Marks are never removed.
#[async_trait]
pub trait Ledger: Send {
    /// Returns true if `key` has been marked in `namespace`
    async fn is_marked(&mut self, namespace: Namespace, key: &str) -> StoreResult<bool>;

    /// Marks `key` as handled in `namespace`
    async fn mark(&mut self, namespace: Namespace, key: &str) -> StoreResult<()>;

    /// Pushes one raw record onto the output queue
    async fn push_record(&mut self, payload: &[u8]) -> StoreResult<()>;
}

/// Connection factory shared by all workers
///
/// Each worker calls [`Store::connect`] once and keeps the connection for
/// its lifetime.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Connection type handed to a worker
    type Connection: Ledger + 'static;

    /// Opens (or borrows) a connection for one worker
    async fn connect(&self) -> StoreResult<Self::Connection>;
}
