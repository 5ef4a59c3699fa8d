/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use fred::{
    interfaces::ClientLike,
    prelude::RedisPool,
    types::{ReconnectPolicy, RedisConfig, RespVersion, TracingConfig},
};
use serde::Deserialize;
use tracing::error;

use super::error::RedisError;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub partition: usize,
    pub password: Option<String>,
    pub use_legacy_version: bool,
    pub pool_size: usize,
    pub reconnect_max_attempts: u32,
    /// Reconnect delay in milliseconds
    pub reconnect_delay: u32,
    /// TTL in seconds
    pub default_ttl: u32,
}

impl Default for RedisSettings {
    fn default() -> Self {
        RedisSettings {
            host: String::from("localhost"),
            port: 6379,
            partition: 0,
            password: None,
            use_legacy_version: false,
            pool_size: 10,
            reconnect_max_attempts: 3,
            reconnect_delay: 1000,
            default_ttl: 3600,
        }
    }
}

impl RedisSettings {
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.partition
            ),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.partition),
        }
    }
}

pub struct RedisConnectionPool {
    pub pool: RedisPool,
    pub config: RedisSettings,
}

impl RedisConnectionPool {
    /// Create a new Redis connection pool and wait until every client is connected.
    pub async fn new(conf: RedisSettings) -> Result<Self, RedisError> {
        let mut config = RedisConfig::from_url(&conf.connection_url())
            .map_err(|err| RedisError::RedisConnectionError(err.to_string()))?;

        if !conf.use_legacy_version {
            config.version = RespVersion::RESP3;
        }
        config.tracing = TracingConfig::new(true);
        let reconnect_policy =
            ReconnectPolicy::new_constant(conf.reconnect_max_attempts, conf.reconnect_delay);

        let pool = RedisPool::new(config, None, None, Some(reconnect_policy), conf.pool_size)
            .map_err(|err| RedisError::RedisConnectionError(err.to_string()))?;

        // the connection task keeps running detached until `quit`
        let _connection_task = pool
            .init()
            .await
            .map_err(|err| RedisError::RedisConnectionError(err.to_string()))?;

        Ok(Self { pool, config: conf })
    }

    pub async fn close_connections(&self) {
        if let Err(error) = self.pool.quit().await {
            error!(tag = "[Redis Shutdown]", %error);
        }
    }
}
