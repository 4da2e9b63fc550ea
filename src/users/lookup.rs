//! User Lookup Service
//!
//! Read-through lookups: try the id mapping cache first, fall back to the
//! source on a miss, then populate both directions. A missing cache (store
//! down) just means every lookup goes to the source.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::{UserRecord, UserSource};
use crate::cache::check_batch_size;
use crate::error::Result;
use crate::manager::ConnectionManager;

/// Outcome of a multi-user lookup, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchLookup {
    pub found: Vec<UserRecord>,
    pub missing: Vec<Uuid>,
}

// == User Lookup ==
#[derive(Clone)]
pub struct UserLookup {
    manager: ConnectionManager,
    source: Arc<dyn UserSource>,
}

impl UserLookup {
    pub fn new(manager: ConnectionManager, source: Arc<dyn UserSource>) -> Self {
        Self { manager, source }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub async fn all(&self) -> Vec<UserRecord> {
        self.source.all().await
    }

    // == By UUID ==
    /// uuid -> id from cache, then id -> record; source by uuid on a miss.
    pub async fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<UserRecord>> {
        if let Some(cache) = self.manager.uuid_to_id_cache().await {
            if let Some(id) = cache.get(&uuid).await {
                match self.source_by_id(id, uuid).await {
                    Some(user) => {
                        debug!(%uuid, id, "User id cache hit");
                        return Ok(Some(user));
                    }
                    None => cache.invalidate(&uuid).await,
                }
            }
        }

        let Some(user) = self.source.find_by_uuid(uuid).await else {
            return Ok(None);
        };
        self.remember(&user).await?;
        Ok(Some(user))
    }

    // == By ID ==
    /// id -> uuid from cache, then uuid -> record; source by id on a miss.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        if let Some(cache) = self.manager.id_to_uuid_cache().await {
            if let Some(uuid) = cache.get(&id).await {
                let user = self
                    .source
                    .find_by_uuid(uuid)
                    .await
                    .filter(|user| user.id == id);
                match user {
                    Some(user) => {
                        debug!(id, %uuid, "User uuid cache hit");
                        return Ok(Some(user));
                    }
                    None => cache.invalidate(&id).await,
                }
            }
        }

        let Some(user) = self.source.find_by_id(id).await else {
            return Ok(None);
        };
        self.remember(&user).await?;
        Ok(Some(user))
    }

    // == Many By UUID ==
    /// Resolves up to the batch ceiling of uuids with one cache round trip
    /// and one pipelined write for whatever had to come from the source.
    pub async fn get_many_by_uuid(&self, uuids: &[Uuid]) -> Result<BatchLookup> {
        check_batch_size(uuids.len(), self.manager.settings().max_batch_size)?;

        let forward = self.manager.uuid_to_id_cache().await;
        let cached = match &forward {
            Some(cache) => cache.batch_get(uuids).await?,
            None => HashMap::new(),
        };

        let mut result = BatchLookup::default();
        let mut fetched = Vec::new();
        let mut seen = HashSet::new();

        for &uuid in uuids {
            if !seen.insert(uuid) {
                continue;
            }

            let hit = match cached.get(&uuid).copied().flatten() {
                Some(id) => self.source_by_id(id, uuid).await,
                None => None,
            };
            if let Some(user) = hit {
                result.found.push(user);
                continue;
            }

            match self.source.find_by_uuid(uuid).await {
                Some(user) => {
                    fetched.push(user.clone());
                    result.found.push(user);
                }
                None => result.missing.push(uuid),
            }
        }

        debug!(
            requested = uuids.len(),
            from_source = fetched.len(),
            missing = result.missing.len(),
            "Batch user lookup"
        );

        if !fetched.is_empty() {
            self.remember_many(&fetched).await?;
        }
        Ok(result)
    }

    // == Internals ==
    async fn source_by_id(&self, id: i64, uuid: Uuid) -> Option<UserRecord> {
        self.source
            .find_by_id(id)
            .await
            .filter(|user| user.uuid == uuid)
    }

    async fn remember(&self, user: &UserRecord) -> Result<()> {
        if let Some(cache) = self.manager.uuid_to_id_cache().await {
            cache.set(&user.uuid, &user.id).await?;
        }
        if let Some(cache) = self.manager.id_to_uuid_cache().await {
            cache.set(&user.id, &user.uuid).await?;
        }
        Ok(())
    }

    async fn remember_many(&self, users: &[UserRecord]) -> Result<()> {
        if let Some(cache) = self.manager.uuid_to_id_cache().await {
            let forward: HashMap<Uuid, i64> = users.iter().map(|u| (u.uuid, u.id)).collect();
            cache.batch_set(&forward).await?;
        }
        if let Some(cache) = self.manager.id_to_uuid_cache().await {
            let reverse: HashMap<i64, Uuid> = users.iter().map(|u| (u.id, u.uuid)).collect();
            cache.batch_set(&reverse).await?;
        }
        Ok(())
    }
}
