//! Redis storage implementation
//!
//! Both ledger namespaces are Redis hashes (`HGET`/`HSET` with the key as its
//! own value) and the output queue is a list fed with `LPUSH`.

use crate::config::RedisConfig;
use crate::storage::traits::{Ledger, Namespace, Store, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::fmt;
use tracing::{debug, info};

/// Redis key names used by the ledger and the output queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKeys {
    pub downloaded: String,
    pub processed: String,
    pub queue: String,
}

impl LedgerKeys {
    fn hash(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Downloaded => &self.downloaded,
            Namespace::Processed => &self.processed,
        }
    }
}

impl From<&RedisConfig> for LedgerKeys {
    fn from(config: &RedisConfig) -> Self {
        Self {
            downloaded: config.downloaded_key.clone(),
            processed: config.processed_key.clone(),
            queue: config.queue.clone(),
        }
    }
}

/// Redis-backed store
pub struct RedisStore {
    client: redis::Client,
    keys: LedgerKeys,
    ping_on_connect: bool,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("keys", &self.keys)
            .field("ping_on_connect", &self.ping_on_connect)
            .finish()
    }
}

impl RedisStore {
    /// Creates a store from configuration
    ///
    /// No connection is made until a worker calls [`Store::connect`].
    pub fn open(config: &RedisConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            keys: LedgerKeys::from(config),
            ping_on_connect: config.ping_on_connect,
        })
    }
}

#[async_trait]
impl Store for RedisStore {
    type Connection = RedisLedger;

    async fn connect(&self) -> StoreResult<RedisLedger> {
        let mut conn = ConnectionManager::new(self.client.clone()).await?;

        if self.ping_on_connect {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            debug!("Redis answered PING with {}", pong);
        }

        info!("Worker connected to Redis");
        Ok(RedisLedger {
            conn,
            keys: self.keys.clone(),
        })
    }
}

/// One worker's Redis connection
pub struct RedisLedger {
    conn: ConnectionManager,
    keys: LedgerKeys,
}

impl fmt::Debug for RedisLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLedger")
            .field("connection", &"ConnectionManager")
            .field("keys", &self.keys)
            .finish()
    }
}

#[async_trait]
impl Ledger for RedisLedger {
    async fn is_marked(&mut self, namespace: Namespace, key: &str) -> StoreResult<bool> {
        let reply: Option<String> = redis::cmd("HGET")
            .arg(self.keys.hash(namespace))
            .arg(key)
            .query_async(&mut self.conn)
            .await?;
        Ok(reply.is_some_and(|value| !value.is_empty()))
    }

    async fn mark(&mut self, namespace: Namespace, key: &str) -> StoreResult<()> {
        let _: () = redis::cmd("HSET")
            .arg(self.keys.hash(namespace))
            .arg(key)
            .arg(key)
            .query_async(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn push_record(&mut self, payload: &[u8]) -> StoreResult<()> {
        let _: () = redis::cmd("LPUSH")
            .arg(&self.keys.queue)
            .arg(payload)
            .query_async(&mut self.conn)
            .await?;
        Ok(())
    }
}
