//! In-process storage implementation
//!
//! Mirrors the Redis layout (two hashes and one list with `LPUSH` order) so
//! pipeline runs can be checked without a server. Cloning the store shares
//! its state.

use crate::storage::traits::{Ledger, Namespace, Store, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    hashes: HashMap<Namespace, HashMap<String, String>>,
    /// Newest record first
    queue: VecDeque<Vec<u8>>,
    /// Every successful write in order, for checking write sequences
    writes: Vec<StoreWrite>,
    unavailable: bool,
}

/// One successful write recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// A key was marked in a namespace
    Mark(Namespace, String),
    /// A record was pushed onto the output queue
    Push(Vec<u8>),
}

/// In-memory store sharing one state across all connections
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`]
    /// until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    /// Marks `key` directly, outside of any pipeline run
    pub fn seed(&self, namespace: Namespace, key: &str) {
        if let Ok(mut state) = self.state.lock() {
            state
                .hashes
                .entry(namespace)
                .or_default()
                .insert(key.to_string(), key.to_string());
        }
    }

    /// Returns true if `key` is marked in `namespace`
    pub fn contains(&self, namespace: Namespace, key: &str) -> bool {
        self.state
            .lock()
            .map(|state| {
                state
                    .hashes
                    .get(&namespace)
                    .and_then(|hash| hash.get(key))
                    .is_some_and(|value| !value.is_empty())
            })
            .unwrap_or(false)
    }

    /// Returns every marked key in `namespace`, sorted
    pub fn keys(&self, namespace: Namespace) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state
            .lock()
            .map(|state| {
                state
                    .hashes
                    .get(&namespace)
                    .map(|hash| hash.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Returns the output queue contents, newest record first
    pub fn queue(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .map(|state| state.queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every successful write in the order it happened
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.state
            .lock()
            .map(|state| state.writes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Connection = MemoryStore;

    async fn connect(&self) -> StoreResult<MemoryStore> {
        if self.lock()?.unavailable {
            return Err(StoreError::Unavailable);
        }
        Ok(self.clone())
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn is_marked(&mut self, namespace: Namespace, key: &str) -> StoreResult<bool> {
        let state = self.lock()?;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        Ok(state
            .hashes
            .get(&namespace)
            .and_then(|hash| hash.get(key))
            .is_some_and(|value| !value.is_empty()))
    }

    async fn mark(&mut self, namespace: Namespace, key: &str) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        state
            .hashes
            .entry(namespace)
            .or_default()
            .insert(key.to_string(), key.to_string());
        state.writes.push(StoreWrite::Mark(namespace, key.to_string()));
        Ok(())
    }

    async fn push_record(&mut self, payload: &[u8]) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        state.queue.push_front(payload.to_vec());
        state.writes.push(StoreWrite::Push(payload.to_vec()));
        Ok(())
    }
}
