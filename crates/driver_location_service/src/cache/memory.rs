/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;

use super::{CacheError, DriverCache};
use crate::{
    common::types::{Driver, DriverWithDistance, Latitude, Longitude},
    redis::keys::{driver_cache_key, nearby_cache_key, nearby_cache_prefix},
};

enum Entry {
    Driver(Driver),
    Nearby(Vec<DriverWithDistance>),
}

/// Process local cache with the same key layout as the Redis cache.
///
/// Keeps hit statistics and can be switched into a failing mode, in which
/// every call returns [`CacheError::Unavailable`].
#[derive(Default)]
pub struct InMemoryDriverCache {
    entries: Mutex<HashMap<String, (Entry, Instant)>>,
    hits: AtomicU64,
    misses: AtomicU64,
    failing: AtomicBool,
}

impl InMemoryDriverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Live nearby entries.
    pub fn nearby_entries(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(key, (entry, expires_at))| {
                        matches!(entry, Entry::Nearby(_))
                            && key.starts_with(&nearby_cache_prefix())
                            && *expires_at > Instant::now()
                    })
                    .count()
            })
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("cache switched off".to_string()))
        } else {
            Ok(())
        }
    }

    fn lookup<T>(
        &self,
        key: &str,
        project: impl FnOnce(&Entry) -> Option<T>,
    ) -> Result<Option<T>, CacheError> {
        self.check()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;

        let expired = matches!(entries.get(key), Some((_, expires_at)) if *expires_at <= Instant::now());
        if expired {
            entries.remove(key);
        }
        let found = entries.get(key).and_then(|(entry, _)| project(entry));

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        } else {
            self.misses.fetch_add(1, Ordering::SeqCst);
        }
        Ok(found)
    }

    fn store(&self, key: String, entry: Entry, ttl: u32) -> Result<(), CacheError> {
        self.check()?;
        let expires_at = Instant::now() + Duration::from_secs(ttl.into());
        self.entries
            .lock()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?
            .insert(key, (entry, expires_at));
        Ok(())
    }
}

#[async_trait]
impl DriverCache for InMemoryDriverCache {
    async fn get(&self, id: &str) -> Result<Option<Driver>, CacheError> {
        self.lookup(&driver_cache_key(id), |entry| match entry {
            Entry::Driver(driver) => Some(driver.to_owned()),
            Entry::Nearby(_) => None,
        })
    }

    async fn set(&self, id: &str, driver: &Driver, ttl: u32) -> Result<(), CacheError> {
        self.store(driver_cache_key(id), Entry::Driver(driver.to_owned()), ttl)
    }

    async fn delete(&self, id: &str) -> Result<(), CacheError> {
        self.check()?;
        self.entries
            .lock()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?
            .remove(&driver_cache_key(id));
        Ok(())
    }

    async fn get_nearby(
        &self,
        lat: &Latitude,
        lon: &Longitude,
        radius: f64,
        limit: i64,
    ) -> Result<Option<Vec<DriverWithDistance>>, CacheError> {
        self.lookup(
            &nearby_cache_key(lat, lon, radius, limit),
            |entry| match entry {
                Entry::Nearby(results) => Some(results.to_owned()),
                Entry::Driver(_) => None,
            },
        )
    }

    async fn set_nearby(
        &self,
        lat: &Latitude,
        lon: &Longitude,
        radius: f64,
        limit: i64,
        results: &[DriverWithDistance],
        ttl: u32,
    ) -> Result<(), CacheError> {
        self.store(
            nearby_cache_key(lat, lon, radius, limit),
            Entry::Nearby(results.to_vec()),
            ttl,
        )
    }

    async fn invalidate_nearby(&self) -> Result<(), CacheError> {
        self.check()?;
        let prefix = nearby_cache_prefix();
        self.entries
            .lock()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.check().is_ok()
    }
}
