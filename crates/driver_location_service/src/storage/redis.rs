/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    geo::EARTH_RADIUS_IN_METERS,
    redis::{error::RedisError, types::RedisConnectionPool},
};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::{
    duplicate_id, mint_driver_id, sort_by_distance_then_sequence, with_timeout, DriverStore,
    StoreError, StoreTimeouts,
};
use crate::{
    common::types::{Driver, DriverWithDistance, GeoPoint},
    redis::keys::*,
};

/// Redis GEO commands measure on this sphere, slightly larger than ours.
const REDIS_EARTH_RADIUS_IN_METERS: f64 = 6372797.560856;

/// Extra meters asked from the index so that rounding in the geohash never
/// hides a driver sitting right on the radius.
const INDEX_SLACK_IN_METERS: f64 = 1.0;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDriver {
    driver: Driver,
    seq: u64,
}

pub struct RedisDriverStore {
    redis: Arc<RedisConnectionPool>,
    timeouts: StoreTimeouts,
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.message())
}

fn index_radius(radius: f64) -> f64 {
    radius * REDIS_EARTH_RADIUS_IN_METERS / EARTH_RADIUS_IN_METERS + INDEX_SLACK_IN_METERS
}

impl RedisDriverStore {
    pub fn new(redis: Arc<RedisConnectionPool>, timeouts: StoreTimeouts) -> Self {
        RedisDriverStore { redis, timeouts }
    }

    async fn read(&self, id: &str) -> Result<Option<StoredDriver>, StoreError> {
        let record = self
            .redis
            .get_key(&driver_details_key(id))
            .await
            .map_err(unavailable)?;

        record
            .map(|record| {
                serde_json::from_str::<StoredDriver>(&record)
                    .map_err(|err| StoreError::Corrupted(err.to_string()))
            })
            .transpose()
    }

    /// Mints the id, stamps both timestamps and reserves an insertion sequence.
    async fn stamp(&self, mut driver: Driver) -> Result<(Driver, u64), StoreError> {
        if driver.id.is_empty() {
            driver.id = mint_driver_id();
        }
        let now = Utc::now();
        driver.created_at = now;
        driver.updated_at = now;

        let seq = self
            .redis
            .incr(&drivers_sequence_key())
            .await
            .map_err(unavailable)? as u64;

        Ok((driver, seq))
    }

    async fn write(&self, driver: Driver, seq: u64) -> Result<Driver, StoreError> {
        let record = serde_json::to_string(&StoredDriver {
            driver: driver.to_owned(),
            seq,
        })
        .map_err(|err| StoreError::Corrupted(err.to_string()))?;

        let created = self
            .redis
            .set_if_absent(&driver_details_key(&driver.id), record)
            .await
            .map_err(unavailable)?;
        if !created {
            return Err(StoreError::Conflict(driver.id));
        }

        if let Err(err) = self
            .redis
            .geo_add(
                &drivers_geo_index_key(),
                driver.location.longitude(),
                driver.location.latitude(),
                &driver.id,
            )
            .await
        {
            // a document without an index entry would be invisible to searches
            if let Err(cleanup_err) = self.redis.delete_key(&driver_details_key(&driver.id)).await {
                error!(tag = "[Driver Create Cleanup]", driver_id = %driver.id, error = %cleanup_err.message());
            }
            return Err(unavailable(err));
        }

        Ok(driver)
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self
            .redis
            .delete_key(&driver_details_key(id))
            .await
            .map_err(unavailable)?;
        // an index member left behind has no document and is skipped by searches
        self.redis
            .zrem(&drivers_geo_index_key(), id)
            .await
            .map_err(unavailable)?;
        Ok(deleted)
    }

    /// Removes every driver of `journal` whose document still carries the
    /// sequence reserved for it, so documents owned by someone else survive.
    async fn rollback(&self, journal: &[(String, u64)]) {
        for (id, seq) in journal {
            let outcome = with_timeout("rollback", self.timeouts.write, async {
                match self.read(id).await? {
                    Some(stored) if stored.seq == *seq => self.remove(id).await.map(|_| ()),
                    _ => Ok(()),
                }
            })
            .await;
            if let Err(err) = outcome {
                error!(tag = "[Batch Create Rollback]", driver_id = %id, error = %err.message());
            }
        }
    }

    /// Index members around `center`, nearest first. With a limit, the
    /// index is asked again up to the distance of the last member so that
    /// drivers tied at the cut are all ranked by insertion order.
    async fn candidates(
        &self,
        center: &GeoPoint,
        radius: f64,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let key = drivers_geo_index_key();
        let (lon, lat) = (center.longitude(), center.latitude());
        let count = (limit > 0).then_some(limit as u64);

        let mut members = self
            .redis
            .geo_search(&key, lon, lat, index_radius(radius), count)
            .await
            .map_err(unavailable)?;

        let edge = members.last().map(|(_, distance)| *distance);
        if let (Some(limit), Some(edge)) = (count, edge) {
            if members.len() as u64 == limit {
                members = self
                    .redis
                    .geo_search(&key, lon, lat, edge + INDEX_SLACK_IN_METERS, None)
                    .await
                    .map_err(unavailable)?;
            }
        }

        Ok(members.into_iter().map(|(member, _)| member).collect())
    }
}

#[async_trait]
impl DriverStore for RedisDriverStore {
    async fn create(&self, driver: Driver) -> Result<Driver, StoreError> {
        with_timeout("create", self.timeouts.write, async {
            let (driver, seq) = self.stamp(driver).await?;
            self.write(driver, seq).await
        })
        .await
    }

    async fn batch_create(&self, drivers: Vec<Driver>) -> Result<Vec<Driver>, StoreError> {
        if drivers.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(id) = duplicate_id(&drivers) {
            return Err(StoreError::Batch(format!("duplicate driver id {id}")));
        }

        // lives outside the timed future so an expired budget still rolls back
        let journal: Mutex<Vec<(String, u64)>> = Mutex::new(Vec::with_capacity(drivers.len()));
        let outcome = with_timeout("batch_create", self.timeouts.batch, async {
            let mut created: Vec<Driver> = Vec::with_capacity(drivers.len());
            for driver in drivers {
                let (driver, seq) = self.stamp(driver).await?;
                journal.lock().await.push((driver.id.to_owned(), seq));
                created.push(self.write(driver, seq).await?);
            }
            Ok(created)
        })
        .await;

        match outcome {
            Ok(created) => {
                info!(tag = "[Batch Create]", count = created.len());
                Ok(created)
            }
            Err(err) => {
                let journal = journal.into_inner();
                error!(tag = "[Batch Create Rollback]", error = %err.message(), reserved = journal.len());
                self.rollback(&journal).await;
                Err(StoreError::Batch(err.message()))
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Driver, StoreError> {
        with_timeout("get", self.timeouts.write, async {
            self.read(id)
                .await?
                .map(|stored| stored.driver)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        })
        .await
    }

    async fn update(&self, driver: Driver) -> Result<Driver, StoreError> {
        with_timeout("update", self.timeouts.write, async {
            let existing = self
                .read(&driver.id)
                .await?
                .ok_or_else(|| StoreError::NotFound(driver.id.to_owned()))?;

            let updated = Driver {
                created_at: existing.driver.created_at,
                updated_at: Utc::now(),
                ..driver
            };
            let record = serde_json::to_string(&StoredDriver {
                driver: updated.to_owned(),
                seq: existing.seq,
            })
            .map_err(|err| StoreError::Corrupted(err.to_string()))?;

            let replaced = self
                .redis
                .set_if_present(&driver_details_key(&updated.id), record)
                .await
                .map_err(unavailable)?;
            if !replaced {
                return Err(StoreError::NotFound(updated.id));
            }

            self.redis
                .geo_add(
                    &drivers_geo_index_key(),
                    updated.location.longitude(),
                    updated.location.latitude(),
                    &updated.id,
                )
                .await
                .map_err(unavailable)?;

            Ok(updated)
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        with_timeout("delete", self.timeouts.write, async {
            if self.remove(id).await? {
                Ok(())
            } else {
                Err(StoreError::NotFound(id.to_string()))
            }
        })
        .await
    }

    async fn search_nearby(
        &self,
        center: &GeoPoint,
        radius: f64,
        limit: usize,
    ) -> Result<Vec<DriverWithDistance>, StoreError> {
        with_timeout("search_nearby", self.timeouts.search, async {
            let ids = self.candidates(center, radius, limit).await?;
            let records = self
                .redis
                .mget_keys(ids.iter().map(|id| driver_details_key(id)).collect())
                .await
                .map_err(unavailable)?;

            let mut ranked = Vec::with_capacity(records.len());
            // documents deleted between the two reads are skipped
            for record in records.into_iter().flatten() {
                let StoredDriver { driver, seq } = serde_json::from_str(&record)
                    .map_err(|err| StoreError::Corrupted(err.to_string()))?;
                let distance = center.distance(&driver.location);
                if distance <= radius {
                    ranked.push((DriverWithDistance { driver, distance }, seq));
                }
            }

            sort_by_distance_then_sequence(&mut ranked);
            if limit > 0 {
                ranked.truncate(limit);
            }

            Ok(ranked.into_iter().map(|(driver, _)| driver).collect())
        })
        .await
    }

    async fn is_empty(&self) -> Result<bool, StoreError> {
        with_timeout("is_empty", self.timeouts.write, async {
            self.redis
                .zcard(&drivers_geo_index_key())
                .await
                .map(|members| members == 0)
                .map_err(unavailable)
        })
        .await
    }
}
