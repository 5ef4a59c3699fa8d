/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shared::redis::{error::RedisError, types::RedisConnectionPool};

use super::{CacheError, DriverCache};
use crate::{
    common::types::{Driver, DriverWithDistance, Latitude, Longitude},
    redis::keys::*,
};

/// Cache over the non persistent Redis.
pub struct RedisDriverCache {
    redis: Arc<RedisConnectionPool>,
}

fn unavailable(err: RedisError) -> CacheError {
    CacheError::Unavailable(err.message())
}

impl RedisDriverCache {
    pub fn new(redis: Arc<RedisConnectionPool>) -> Self {
        RedisDriverCache { redis }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let value = self.redis.get_key(key).await.map_err(unavailable)?;
        value
            .map(|value| {
                serde_json::from_str::<T>(&value)
                    .map_err(|err| CacheError::Serialization(err.to_string()))
            })
            .transpose()
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: u32,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_string(value)
            .map_err(|err| CacheError::Serialization(err.to_string()))?;
        self.redis
            .set_with_expiry(key, value, ttl)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl DriverCache for RedisDriverCache {
    async fn get(&self, id: &str) -> Result<Option<Driver>, CacheError> {
        self.read(&driver_cache_key(id)).await
    }

    async fn set(&self, id: &str, driver: &Driver, ttl: u32) -> Result<(), CacheError> {
        self.write(&driver_cache_key(id), driver, ttl).await
    }

    async fn delete(&self, id: &str) -> Result<(), CacheError> {
        self.redis
            .delete_key(&driver_cache_key(id))
            .await
            .map(|_| ())
            .map_err(unavailable)
    }

    async fn get_nearby(
        &self,
        lat: &Latitude,
        lon: &Longitude,
        radius: f64,
        limit: i64,
    ) -> Result<Option<Vec<DriverWithDistance>>, CacheError> {
        self.read(&nearby_cache_key(lat, lon, radius, limit)).await
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
        self.write(&nearby_cache_key(lat, lon, radius, limit), results, ttl)
            .await
    }

    async fn invalidate_nearby(&self) -> Result<(), CacheError> {
        let keys = self
            .redis
            .scan_keys(&format!("{}*", nearby_cache_prefix()))
            .await
            .map_err(unavailable)?;
        self.redis
            .delete_keys(keys)
            .await
            .map(|_| ())
            .map_err(unavailable)
    }

    async fn is_healthy(&self) -> bool {
        self.redis.ping().await.is_ok()
    }
}
