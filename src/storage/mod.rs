//! Storage module for the dedup ledger and output queue
//!
//! This module handles all key-value store access for the pipeline:
//! - The archive-level ledger ("downloaded" namespace)
//! - The record-level ledger ("processed" namespace)
//! - The output queue records are pushed onto
//!
//! Two backends are provided: Redis for real runs and an in-memory store with
//! the same semantics for tests.

mod memory;
mod redis_store;
mod traits;

pub use memory::{MemoryStore, StoreWrite};
pub use redis_store::{LedgerKeys, RedisLedger, RedisStore};
pub use traits::{Ledger, Namespace, Store, StoreError, StoreResult};
