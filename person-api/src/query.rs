use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use person_common::cache::{CacheError, Client};
use person_common::models::{ListQuery, PersistedUser};
use person_common::store::{StoreResult, UserStore};
use tracing::warn;

/// How long a cached page stays valid. Entries are never invalidated by writes.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub fn cache_key(query: &ListQuery) -> String {
    format!(
        "users:p={}:s={}:f={}",
        query.page, query.size, query.filter
    )
}

/// Cache-aside reads of user pages: serve from the cache when possible, otherwise read
/// storage and populate the cache. Cache failures only ever cost a storage read.
pub struct UserQueryService {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn Client + Send + Sync>,
}

impl UserQueryService {
    pub fn new(store: Arc<dyn UserStore>, cache: Arc<dyn Client + Send + Sync>) -> Self {
        Self { store, cache }
    }

    pub async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PersistedUser>> {
        let key = cache_key(query);

        match self.cache.get(key.clone()).await {
            Ok(cached) => match serde_json::from_str::<Vec<PersistedUser>>(&cached) {
                Ok(users) => {
                    counter!("person_users_cache_total", "result" => "hit").increment(1);
                    return Ok(users);
                }
                Err(e) => warn!(key, error = %e, "discarding undecodable cache entry"),
            },
            Err(CacheError::NotFound) => {}
            Err(e) => warn!(key, error = %e, "failed to read users from cache"),
        }
        counter!("person_users_cache_total", "result" => "miss").increment(1);

        let users = self.store.list(query).await?;

        match serde_json::to_string(&users) {
            Ok(serialized) => {
                if let Err(e) = self
                    .cache
                    .setex(key.clone(), serialized, CACHE_TTL.as_secs())
                    .await
                {
                    warn!(key, error = %e, "failed to write users to cache");
                }
            }
            Err(e) => warn!(key, error = %e, "failed to serialize users for cache"),
        }

        Ok(users)
    }
}
