/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Advisory cache in front of the driver store.
//!
//! Reads return `Ok(None)` on a miss and `Err` only when the backend itself
//! failed. Callers log errors and carry on against the store.

pub mod memory;
pub mod null;
pub mod redis;

use async_trait::async_trait;

use crate::common::types::{Driver, DriverWithDistance, Latitude, Longitude};

#[macros::add_error]
pub enum CacheError {
    Unavailable(String),
    Serialization(String),
}

impl CacheError {
    pub fn message(&self) -> String {
        match self {
            CacheError::Unavailable(err) => format!("cache unavailable: {err}"),
            CacheError::Serialization(err) => format!("cache entry unreadable: {err}"),
        }
    }
}

#[async_trait]
pub trait DriverCache: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Driver>, CacheError>;

    async fn set(&self, id: &str, driver: &Driver, ttl: u32) -> Result<(), CacheError>;

    async fn delete(&self, id: &str) -> Result<(), CacheError>;

    async fn get_nearby(
        &self,
        lat: &Latitude,
        lon: &Longitude,
        radius: f64,
        limit: i64,
    ) -> Result<Option<Vec<DriverWithDistance>>, CacheError>;

    async fn set_nearby(
        &self,
        lat: &Latitude,
        lon: &Longitude,
        radius: f64,
        limit: i64,
        results: &[DriverWithDistance],
        ttl: u32,
    ) -> Result<(), CacheError>;

    /// Drops every nearby entry written before the call.
    async fn invalidate_nearby(&self) -> Result<(), CacheError>;

    async fn is_healthy(&self) -> bool;

    /// `false` for the no-op cache used when caching is switched off.
    fn is_enabled(&self) -> bool {
        true
    }
}
