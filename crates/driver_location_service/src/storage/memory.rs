/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    duplicate_id, mint_driver_id, sort_by_distance_then_sequence, DriverStore, StoreError,
};
use crate::common::types::{Driver, DriverWithDistance, GeoPoint};

#[derive(Default)]
struct Drivers {
    by_id: HashMap<String, (Driver, u64)>,
    next_seq: u64,
}

impl Drivers {
    fn insert(&mut self, mut driver: Driver) -> Result<Driver, StoreError> {
        if driver.id.is_empty() {
            driver.id = mint_driver_id();
        }
        if self.by_id.contains_key(&driver.id) {
            return Err(StoreError::Conflict(driver.id));
        }
        let now = Utc::now();
        driver.created_at = now;
        driver.updated_at = now;

        self.next_seq += 1;
        self.by_id
            .insert(driver.id.to_owned(), (driver.to_owned(), self.next_seq));
        Ok(driver)
    }
}

/// Linear scan store, every call is counted so tests can tell whether the
/// store was consulted at all.
#[derive(Default)]
pub struct InMemoryDriverStore {
    drivers: RwLock<Drivers>,
    calls: AtomicU64,
}

impl InMemoryDriverStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.drivers.read().await.by_id.len()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DriverStore for InMemoryDriverStore {
    async fn create(&self, driver: Driver) -> Result<Driver, StoreError> {
        self.touch();
        self.drivers.write().await.insert(driver)
    }

    async fn batch_create(&self, drivers: Vec<Driver>) -> Result<Vec<Driver>, StoreError> {
        self.touch();
        if drivers.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(id) = duplicate_id(&drivers) {
            return Err(StoreError::Batch(format!("duplicate driver id {id}")));
        }

        let mut state = self.drivers.write().await;
        if let Some(existing) = drivers
            .iter()
            .find(|driver| state.by_id.contains_key(&driver.id))
        {
            return Err(StoreError::Batch(
                StoreError::Conflict(existing.id.to_owned()).message(),
            ));
        }

        drivers
            .into_iter()
            .map(|driver| state.insert(driver))
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Driver, StoreError> {
        self.touch();
        self.drivers
            .read()
            .await
            .by_id
            .get(id)
            .map(|(driver, _)| driver.to_owned())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, driver: Driver) -> Result<Driver, StoreError> {
        self.touch();
        let mut state = self.drivers.write().await;
        let (existing, _) = state
            .by_id
            .get_mut(&driver.id)
            .ok_or_else(|| StoreError::NotFound(driver.id.to_owned()))?;

        *existing = Driver {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..driver
        };
        Ok(existing.to_owned())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.touch();
        self.drivers
            .write()
            .await
            .by_id
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn search_nearby(
        &self,
        center: &GeoPoint,
        radius: f64,
        limit: usize,
    ) -> Result<Vec<DriverWithDistance>, StoreError> {
        self.touch();
        let state = self.drivers.read().await;
        let mut ranked: Vec<(DriverWithDistance, u64)> = state
            .by_id
            .values()
            .filter_map(|(driver, seq)| {
                let distance = center.distance(&driver.location);
                (distance <= radius).then(|| {
                    (
                        DriverWithDistance {
                            driver: driver.to_owned(),
                            distance,
                        },
                        *seq,
                    )
                })
            })
            .collect();

        sort_by_distance_then_sequence(&mut ranked);
        if limit > 0 {
            ranked.truncate(limit);
        }
        Ok(ranked.into_iter().map(|(driver, _)| driver).collect())
    }

    async fn is_empty(&self) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.drivers.read().await.by_id.is_empty())
    }
}
