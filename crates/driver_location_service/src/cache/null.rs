/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use async_trait::async_trait;

use super::{CacheError, DriverCache};
use crate::common::types::{Driver, DriverWithDistance, Latitude, Longitude};

/// Every read misses and every write is dropped.
pub struct NullDriverCache;

#[async_trait]
impl DriverCache for NullDriverCache {
    async fn get(&self, _id: &str) -> Result<Option<Driver>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _id: &str, _driver: &Driver, _ttl: u32) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _id: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get_nearby(
        &self,
        _lat: &Latitude,
        _lon: &Longitude,
        _radius: f64,
        _limit: i64,
    ) -> Result<Option<Vec<DriverWithDistance>>, CacheError> {
        Ok(None)
    }

    async fn set_nearby(
        &self,
        _lat: &Latitude,
        _lon: &Longitude,
        _radius: f64,
        _limit: i64,
        _results: &[DriverWithDistance],
        _ttl: u32,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn invalidate_nearby(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
