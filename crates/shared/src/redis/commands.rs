/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::redis::{error::RedisError, types::RedisConnectionPool};
use fred::{
    interfaces::{ClientLike, GeoInterface, KeysInterface, SortedSetsInterface},
    types::{
        Expiration, GeoPosition, GeoUnit, GeoValue, RedisValue, Scanner, SetOptions, SortOrder,
    },
};
use futures::StreamExt;
use tracing::instrument;

const SCAN_PAGE_SIZE: u32 = 500;

impl RedisConnectionPool {
    // PING on the next client of the pool
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn ping(&self) -> Result<(), RedisError> {
        self.pool
            .next()
            .ping::<String>()
            .await
            .map(|_| ())
            .map_err(|err| RedisError::PingFailed(err.to_string()))
    }

    // set key with expiry
    #[instrument(level = "DEBUG", skip(self, value))]
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        expiry: u32,
    ) -> Result<(), RedisError> {
        self.pool
            .set::<(), _, _>(key, value, Some(Expiration::EX(expiry.into())), None, false)
            .await
            .map_err(|err| RedisError::SetFailed(err.to_string()))
    }

    // SET NX, returns false when the key already exists
    #[instrument(level = "DEBUG", skip(self, value))]
    pub async fn set_if_absent(&self, key: &str, value: String) -> Result<bool, RedisError> {
        let output: RedisValue = self
            .pool
            .set(key, value, None, Some(SetOptions::NX), false)
            .await
            .map_err(|err| RedisError::SetFailed(err.to_string()))?;

        Ok(!output.is_null())
    }

    // SET XX, returns false when the key does not exist
    #[instrument(level = "DEBUG", skip(self, value))]
    pub async fn set_if_present(&self, key: &str, value: String) -> Result<bool, RedisError> {
        let output: RedisValue = self
            .pool
            .set(key, value, None, Some(SetOptions::XX), false)
            .await
            .map_err(|err| RedisError::SetFailed(err.to_string()))?;

        Ok(!output.is_null())
    }

    // get key
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn get_key(&self, key: &str) -> Result<Option<String>, RedisError> {
        self.pool
            .get::<Option<String>, _>(key)
            .await
            .map_err(|err| RedisError::GetFailed(err.to_string()))
    }

    // MGET
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn mget_keys(&self, keys: Vec<String>) -> Result<Vec<Option<String>>, RedisError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        self.pool
            .mget::<Vec<Option<String>>, _>(keys)
            .await
            .map_err(|err| RedisError::MGetFailed(err.to_string()))
    }

    // delete key, returns false when nothing was removed
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn delete_key(&self, key: &str) -> Result<bool, RedisError> {
        let deleted = self
            .pool
            .del::<i64, _>(key)
            .await
            .map_err(|err| RedisError::DeleteFailed(err.to_string()))?;

        Ok(deleted > 0)
    }

    // delete keys
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn delete_keys(&self, keys: Vec<String>) -> Result<i64, RedisError> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.pool
            .del::<i64, _>(keys)
            .await
            .map_err(|err| RedisError::DeleteFailed(err.to_string()))
    }

    // SCAN MATCH pattern
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, RedisError> {
        let mut keys = Vec::new();
        let mut pages = self.pool.next().scan(pattern, Some(SCAN_PAGE_SIZE), None);

        while let Some(page) = pages.next().await {
            let mut page = page.map_err(|err| RedisError::ScanFailed(err.to_string()))?;
            if let Some(results) = page.take_results() {
                keys.extend(results.into_iter().filter_map(|key| key.into_string()));
            }
            let _ = page.next();
        }

        Ok(keys)
    }

    // INCR
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn incr(&self, key: &str) -> Result<i64, RedisError> {
        self.pool
            .incr::<i64, _>(key)
            .await
            .map_err(|err| RedisError::IncrFailed(err.to_string()))
    }

    //GEOADD
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn geo_add(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        member: &str,
    ) -> Result<(), RedisError> {
        let value = GeoValue {
            coordinates: GeoPosition {
                longitude,
                latitude,
            },
            member: member.into(),
        };

        self.pool
            .geoadd::<RedisValue, _, _>(key, None, false, value)
            .await
            .map(|_| ())
            .map_err(|err| RedisError::GeoAddFailed(err.to_string()))
    }

    /// GEOSEARCH FROMLONLAT BYRADIUS ASC WITHDIST, returns `(member, distance in meters)`.
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn geo_search(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius: f64,
        count: Option<u64>,
    ) -> Result<Vec<(String, f64)>, RedisError> {
        let output: RedisValue = self
            .pool
            .geosearch(
                key,
                None,
                Some(GeoPosition {
                    longitude,
                    latitude,
                }),
                Some((radius, GeoUnit::Meters)),
                None,
                Some(SortOrder::Asc),
                count.map(|count| (count, false)),
                false,
                true,
                false,
            )
            .await
            .map_err(|err| RedisError::GeoSearchFailed(err.to_string()))?;

        let members = output
            .into_geo_radius_result(false, true, false)
            .map_err(|err| RedisError::GeoSearchFailed(err.to_string()))?;

        Ok(members
            .into_iter()
            .filter_map(|info| {
                info.member
                    .as_string()
                    .map(|member| (member, info.distance.unwrap_or_default()))
            })
            .collect())
    }

    //ZREM
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn zrem(&self, key: &str, member: &str) -> Result<i64, RedisError> {
        self.pool
            .zrem::<i64, _, _>(key, member)
            .await
            .map_err(|err| RedisError::ZRemFailed(err.to_string()))
    }

    //ZCARD
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn zcard(&self, key: &str) -> Result<u64, RedisError> {
        self.pool
            .zcard::<u64, _>(key)
            .await
            .map_err(|err| RedisError::ZCardFailed(err.to_string()))
    }
}
