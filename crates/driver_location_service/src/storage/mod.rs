/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Authoritative persistence of drivers.
//!
//! Every backend keeps a spherical index over `location` and answers radius
//! queries ordered by ascending distance, ties broken by insertion order.

pub mod memory;
pub mod redis;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::types::{Driver, DriverWithDistance, GeoPoint};

#[macros::add_error]
pub enum StoreError {
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Timeout(String),
    Batch(String),
    Corrupted(String),
}

impl StoreError {
    pub fn message(&self) -> String {
        match self {
            StoreError::NotFound(id) => format!("driver not found: {id}"),
            StoreError::Conflict(id) => format!("driver already exists: {id}"),
            StoreError::Unavailable(err) => format!("store unavailable: {err}"),
            StoreError::Timeout(operation) => format!("store timed out during {operation}"),
            StoreError::Batch(err) => format!("batch rejected: {err}"),
            StoreError::Corrupted(err) => format!("stored driver is unreadable: {err}"),
        }
    }
}

#[async_trait]
pub trait DriverStore: Send + Sync {
    /// Stores `driver`, minting an id when it is empty and stamping both timestamps.
    async fn create(&self, driver: Driver) -> Result<Driver, StoreError>;

    /// All-or-nothing. An empty batch is a successful no-op.
    async fn batch_create(&self, drivers: Vec<Driver>) -> Result<Vec<Driver>, StoreError>;

    async fn get(&self, id: &str) -> Result<Driver, StoreError>;

    /// Replaces the location of an existing driver and refreshes `updated_at`.
    async fn update(&self, driver: Driver) -> Result<Driver, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Drivers within `radius` meters of `center`, nearest first. `limit = 0`
    /// means unbounded.
    async fn search_nearby(
        &self,
        center: &GeoPoint,
        radius: f64,
        limit: usize,
    ) -> Result<Vec<DriverWithDistance>, StoreError>;

    async fn is_empty(&self) -> Result<bool, StoreError>;
}

/// Per operation budgets, in milliseconds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct StoreTimeouts {
    pub write: u64,
    pub batch: u64,
    pub search: u64,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        StoreTimeouts {
            write: 5000,
            batch: 30000,
            search: 10000,
        }
    }
}

/// Runs `operation` within `budget`. The future is dropped on expiry, which
/// releases whatever connection it was holding.
pub async fn with_timeout<T, F>(operation: &str, budget: u64, future: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(Duration::from_millis(budget), future)
        .await
        .map_err(|_| StoreError::Timeout(operation.to_string()))?
}

/// Orders candidates the way every backend must return them.
pub(crate) fn sort_by_distance_then_sequence(candidates: &mut [(DriverWithDistance, u64)]) {
    candidates.sort_by(|(a, a_seq), (b, b_seq)| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a_seq.cmp(b_seq))
    });
}

pub(crate) fn duplicate_id(drivers: &[Driver]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    drivers
        .iter()
        .filter(|driver| !driver.id.is_empty())
        .find(|driver| !seen.insert(driver.id.as_str()))
        .map(|driver| driver.id.as_str())
}

pub(crate) fn mint_driver_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
