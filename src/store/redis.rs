//! Redis Store Module
//!
//! [`RemoteStore`] over a `deadpool-redis` connection pool. Every command is
//! bounded by the socket timeout so a hung server shows up as
//! [`StoreError::Timeout`] instead of suspending the caller forever.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolSettings, Connection, Pool, PoolConfig, Runtime, Timeouts};
use redis::{AsyncCommands, RedisResult};
use tracing::debug;

use super::{effective_ttl, RemoteStore, StoreConnector};
use crate::config::{redact_url, ConnectionSettings};
use crate::error::{StoreError, StoreResult};

// == Redis Store ==
/// A pooled handle onto one Redis server.
pub struct RedisStore {
    pool: Pool,
    op_timeout: Duration,
}

impl RedisStore {
    /// Builds the pool. Connections are opened lazily on first use.
    pub fn open(url: &str, settings: &ConnectionSettings) -> StoreResult<Self> {
        let mut timeouts = Timeouts::new();
        timeouts.wait = Some(settings.socket_timeout);
        timeouts.create = Some(settings.connect_timeout);
        timeouts.recycle = Some(settings.socket_timeout);

        let mut pool_config = PoolConfig::new(settings.pool_size);
        pool_config.timeouts = timeouts;

        let mut pool_settings = PoolSettings::from_url(url);
        pool_settings.pool = Some(pool_config);

        let pool = pool_settings
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            op_timeout: settings.socket_timeout,
        })
    }

    async fn connection(&self) -> StoreResult<Connection> {
        Ok(self.pool.get().await?)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = RedisResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        self.bounded(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        match effective_ttl(ttl) {
            Some(secs) => self.bounded(conn.set_ex(key, value, secs)).await,
            None => self.bounded(conn.set(key, value)).await,
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        self.bounded(conn.del(key)).await
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let mut conn = self.connection().await?;
        let values: Vec<Option<Vec<u8>>> = self
            .bounded(redis::cmd("MGET").arg(keys).query_async(&mut conn))
            .await?;

        if values.len() != keys.len() {
            return Err(StoreError::Protocol(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }
        Ok(values)
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Option<u64>) -> StoreResult<()> {
        let ttl = effective_ttl(ttl);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            if let Some(secs) = ttl {
                pipe.set_ex(key, value, secs).ignore();
            } else {
                pipe.set(key, value).ignore();
            }
        }

        let mut conn = self.connection().await?;
        self.bounded(pipe.query_async(&mut conn)).await
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        debug!("Closing redis connection pool");
        self.pool.close();
    }
}

// == Redis Connector ==
/// Opens [`RedisStore`] pools against a fixed URL.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    url: String,
    settings: ConnectionSettings,
}

impl RedisConnector {
    pub fn new(url: impl Into<String>, settings: ConnectionSettings) -> Self {
        Self {
            url: url.into(),
            settings,
        }
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn RemoteStore>> {
        let store = RedisStore::open(&self.url, &self.settings)?;
        Ok(Arc::new(store))
    }

    fn describe(&self) -> String {
        redact_url(&self.url)
    }
}
