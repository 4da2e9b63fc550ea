//! In-process Store Module
//!
//! A [`RemoteStore`] backed by a `HashMap` with TTL expiry. Several handles can
//! share one [`MemoryBackend`], which is how a reconnection gets a "new
//! connection" to the same data. Handles and the backend can be made to fail
//! so degraded paths can be exercised without a real server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{effective_ttl, RemoteStore, StoreConnector, StoredEntry};
use crate::error::{StoreError, StoreResult};

/// Period of the expiry sweep a [`MemoryConnector`] starts on first connect.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// == Memory Backend ==
/// The shared data behind one or more [`MemoryStore`] handles.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredEntry>>,
    reachable: AtomicBool,
    round_trips: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            round_trips: AtomicUsize::new(0),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Simulates the whole server going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Number of commands (or pipelines) that reached the backend.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Whether a live (unexpired) entry exists, without counting a round trip.
    pub async fn contains_key(&self, key: &str) -> bool {
        let entries = self.entries.lock().await;
        entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    /// Remaining TTL of a live entry, in whole seconds.
    pub async fn ttl_secs(&self, key: &str) -> Option<u64> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(StoredEntry::ttl_remaining)
            .map(|remaining| remaining.as_secs())
    }

    /// Removes expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Spawns a task that purges expired entries every `interval`.
    ///
    /// The task only holds a weak reference and ends once the backend is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let backend = Arc::downgrade(self);

        tokio::spawn(async move {
            debug!(
                interval_secs = interval.as_secs(),
                "Starting memory store expiry sweep"
            );

            loop {
                tokio::time::sleep(interval).await;

                let Some(backend) = backend.upgrade() else {
                    break;
                };
                let removed = backend.purge_expired().await;

                if removed > 0 {
                    info!(removed, "Memory store sweep removed expired entries");
                } else {
                    debug!("Memory store sweep found no expired entries");
                }
            }

            debug!("Memory store expiry sweep stopped");
        })
    }

    #[cfg(test)]
    async fn stored_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn read_live(entries: &mut HashMap<String, StoredEntry>, key: &str) -> Option<Vec<u8>> {
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

// == Memory Store ==
/// One handle onto a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryStore {
    backend: Arc<MemoryBackend>,
    broken: AtomicBool,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Creates a handle with its own private backend.
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    pub fn with_backend(backend: Arc<MemoryBackend>) -> Self {
        Self {
            backend,
            broken: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    /// Simulates this one connection being reset; other handles are unaffected.
    pub fn break_connection(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn round_trip(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection closed".to_string()));
        }
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection reset by peer".to_string()));
        }
        if !self.backend.is_reachable() {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        self.backend.round_trips.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.round_trip()?;
        let mut entries = self.backend.entries.lock().await;
        Ok(MemoryBackend::read_live(&mut entries, key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> StoreResult<()> {
        self.round_trip()?;
        let entry = StoredEntry::new(value.as_bytes().to_vec(), effective_ttl(ttl));
        self.backend
            .entries
            .lock()
            .await
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.round_trip()?;
        self.backend.entries.lock().await.remove(key);
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        self.round_trip()?;
        let mut entries = self.backend.entries.lock().await;
        Ok(keys
            .iter()
            .map(|key| MemoryBackend::read_live(&mut entries, key))
            .collect())
    }

    async fn set_many(&self, batch: &[(String, String)], ttl: Option<u64>) -> StoreResult<()> {
        self.round_trip()?;
        let ttl = effective_ttl(ttl);
        // One lock for the whole batch keeps it atomic to other handles.
        let mut entries = self.backend.entries.lock().await;
        for (key, value) in batch {
            entries.insert(key.clone(), StoredEntry::new(value.as_bytes().to_vec(), ttl));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.round_trip()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// == Memory Connector ==
/// Hands out fresh [`MemoryStore`] handles onto one shared backend.
#[derive(Debug)]
pub struct MemoryConnector {
    backend: Arc<MemoryBackend>,
    connects: AtomicUsize,
    connect_delay_ms: AtomicU64,
    sweeping: AtomicBool,
    last: std::sync::Mutex<Option<Arc<MemoryStore>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    pub fn with_backend(backend: Arc<MemoryBackend>) -> Self {
        Self {
            backend,
            connects: AtomicUsize::new(0),
            connect_delay_ms: AtomicU64::new(0),
            sweeping: AtomicBool::new(false),
            last: std::sync::Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    /// Number of connection attempts made so far, successful or not.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Makes every later `connect` take `delay` before answering.
    pub fn set_connect_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.connect_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// The most recently issued handle.
    pub fn last_handle(&self) -> Option<Arc<MemoryStore>> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn RemoteStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if !self.backend.is_reachable() {
            return Err(StoreError::Connection("connection refused".to_string()));
        }

        if !self.sweeping.swap(true, Ordering::SeqCst) {
            self.backend.spawn_sweeper(SWEEP_INTERVAL);
        }

        let handle = Arc::new(MemoryStore::with_backend(self.backend.clone()));
        if let Ok(mut last) = self.last.lock() {
            *last = Some(handle.clone());
        }
        Ok(handle)
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}
