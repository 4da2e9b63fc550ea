//! Connection Manager Module
//!
//! Owns the one shared store handle for the process, the two user key-space
//! caches built on it, and the background task that keeps it healthy.
//!
//! # Lifecycle
//! ```text
//! Disconnected --connect()--> Connecting --probe ok--> Connected
//!      ^                          |                      |  ^
//!      |<-------probe failed------+          probe fails |  | probe ok
//!      |                                                 v  |
//!      |<--reconnect failed-- Reconnecting <--threshold-- Degraded
//! ```
//! `disconnect()` returns to Disconnected from any state.

mod health;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{IdToUuidCache, UuidToIdCache};
use crate::config::{Config, ConnectionSettings};
use crate::error::{CacheError, Result, StoreResult};
use crate::store::{probe, MemoryConnector, RedisConnector, RemoteStore, StoreConnector};

// == Connection State ==
/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Connected, but recent health probes have failed
    Degraded,
    Reconnecting,
}

// == Health Status ==
/// Externally reportable liveness of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Handle present and answering probes
    Healthy,
    /// Handle present but the probe failed or timed out
    Degraded,
    /// No handle at all
    Unavailable,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        self == HealthStatus::Healthy
    }
}

// == Session ==
/// A store handle and the caches bound to it. Swapped as one unit.
struct Session {
    store: Arc<dyn RemoteStore>,
    uuid_to_id: Arc<UuidToIdCache>,
    id_to_uuid: Arc<IdToUuidCache>,
}

impl Session {
    fn new(store: Arc<dyn RemoteStore>, settings: &ConnectionSettings) -> Self {
        let uuid_to_id = UuidToIdCache::with_ttl(store.clone(), settings.uuid_to_id_ttl)
            .with_max_batch_size(settings.max_batch_size);
        let id_to_uuid = IdToUuidCache::with_ttl(store.clone(), settings.id_to_uuid_ttl)
            .with_max_batch_size(settings.max_batch_size);

        Self {
            store,
            uuid_to_id: Arc::new(uuid_to_id),
            id_to_uuid: Arc::new(id_to_uuid),
        }
    }
}

struct Slot {
    state: ConnectionState,
    session: Option<Arc<Session>>,
}

struct HealthTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Inner {
    connector: Arc<dyn StoreConnector>,
    settings: ConnectionSettings,
    slot: RwLock<Slot>,
    /// Serializes connect/disconnect
    lifecycle: Mutex<Option<HealthTask>>,
    /// Serializes handle swaps
    reconnect_lock: Mutex<()>,
    /// Mirror of the health loop's consecutive-failure counter
    failures: AtomicU32,
}

// == Connection Manager ==
/// Shared owner of the store connection.
///
/// Cloning is cheap; all clones observe the same session. Construct one at
/// startup and pass it to whatever needs a cache.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    // == Constructors ==
    pub fn new(connector: Arc<dyn StoreConnector>, settings: ConnectionSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                settings,
                slot: RwLock::new(Slot {
                    state: ConnectionState::Disconnected,
                    session: None,
                }),
                lifecycle: Mutex::new(None),
                reconnect_lock: Mutex::new(()),
                failures: AtomicU32::new(0),
            }),
        }
    }

    /// Picks the connector from the URL scheme (`memory://` or Redis).
    pub fn from_config(config: &Config) -> Self {
        let connector: Arc<dyn StoreConnector> = if config.redis_url.starts_with("memory://") {
            Arc::new(MemoryConnector::new())
        } else {
            Arc::new(RedisConnector::new(
                config.redis_url.clone(),
                config.connection.clone(),
            ))
        };
        Self::new(connector, config.connection.clone())
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.inner.settings
    }

    // == Connect ==
    /// Establishes and probes the connection, then starts the health task.
    ///
    /// A no-op when already connected. Failures are returned so startup can
    /// abort.
    pub async fn connect(&self) -> Result<()> {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if self.inner.slot.read().await.session.is_some() {
            return Ok(());
        }

        // A task left over from a failed reconnection has nothing to watch.
        if let Some(task) = lifecycle.take() {
            task.stop().await;
        }

        self.inner.set_state(ConnectionState::Connecting).await;
        info!(store = %self.inner.connector.describe(), "Connecting to cache store");

        let session = match self.inner.establish().await {
            Ok(session) => session,
            Err(err) => {
                self.inner.set_state(ConnectionState::Disconnected).await;
                error!(error = %err, "Cache store connection failed");
                return Err(CacheError::Connection(err.to_string()));
            }
        };

        {
            let mut slot = self.inner.slot.write().await;
            slot.session = Some(session);
            slot.state = ConnectionState::Connected;
        }
        self.inner.failures.store(0, Ordering::SeqCst);

        *lifecycle = Some(HealthTask::spawn(&self.inner));
        info!("Cache store connected");
        Ok(())
    }

    // == Disconnect ==
    /// Stops the health task, closes the handle and drops both caches.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if let Some(task) = lifecycle.take() {
            task.stop().await;
        }

        let _swap = self.inner.reconnect_lock.lock().await;
        let session = {
            let mut slot = self.inner.slot.write().await;
            slot.state = ConnectionState::Disconnected;
            slot.session.take()
        };
        self.inner.failures.store(0, Ordering::SeqCst);

        if let Some(session) = session {
            session.store.close().await;
            info!("Cache store disconnected");
        }
    }

    // == Accessors ==
    /// The uuid -> id cache, or None while disconnected.
    pub async fn uuid_to_id_cache(&self) -> Option<Arc<UuidToIdCache>> {
        self.inner.session().await.map(|s| s.uuid_to_id.clone())
    }

    /// The id -> uuid cache, or None while disconnected.
    pub async fn id_to_uuid_cache(&self) -> Option<Arc<IdToUuidCache>> {
        self.inner.session().await.map(|s| s.id_to_uuid.clone())
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.session().await.is_some()
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.slot.read().await.state
    }

    /// Consecutive failed health probes since the last success or reconnect.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.failures.load(Ordering::SeqCst)
    }

    // == Health ==
    /// Probes the current handle.
    pub async fn health(&self) -> HealthStatus {
        let Some(session) = self.inner.session().await else {
            return HealthStatus::Unavailable;
        };
        match probe(session.store.as_ref(), self.inner.settings.probe_timeout).await {
            Ok(()) => HealthStatus::Healthy,
            Err(err) => {
                warn!(error = %err, "Cache store health probe failed");
                HealthStatus::Degraded
            }
        }
    }
}

impl Inner {
    async fn session(&self) -> Option<Arc<Session>> {
        self.slot.read().await.session.clone()
    }

    async fn set_state(&self, state: ConnectionState) {
        self.slot.write().await.state = state;
    }

    /// New handle from the connector, probed before use.
    async fn establish(&self) -> StoreResult<Arc<Session>> {
        let store = self.connector.connect().await?;
        if let Err(err) = probe(store.as_ref(), self.settings.probe_timeout).await {
            store.close().await;
            return Err(err);
        }
        Ok(Arc::new(Session::new(store, &self.settings)))
    }

    /// Replaces the session with a fresh one. Returns whether it succeeded.
    ///
    /// The old session stays visible until the new one is ready, so callers
    /// see either the old handle (failing open) or the new one.
    async fn reconnect(&self) -> bool {
        let _swap = self.reconnect_lock.lock().await;

        let old = {
            let mut slot = self.slot.write().await;
            slot.state = ConnectionState::Reconnecting;
            slot.session.clone()
        };
        if let Some(old) = old {
            old.store.close().await;
        }

        warn!(store = %self.connector.describe(), "Reconnecting to cache store");
        match self.establish().await {
            Ok(session) => {
                let mut slot = self.slot.write().await;
                slot.session = Some(session);
                slot.state = ConnectionState::Connected;
                info!("Cache store reconnected");
                true
            }
            Err(err) => {
                let mut slot = self.slot.write().await;
                slot.session = None;
                slot.state = ConnectionState::Disconnected;
                error!(error = %err, "Cache store reconnection failed, caching disabled");
                false
            }
        }
    }
}

impl HealthTask {
    fn spawn(inner: &Arc<Inner>) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(health::run(Arc::downgrade(inner), rx));
        Self { shutdown, handle }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            if err.is_panic() {
                error!(error = %err, "Health check task panicked");
            }
        }
    }
}
