/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use std::{env::var, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use shared::{
    redis::types::{RedisConnectionPool, RedisSettings},
    utils::logger::*,
};

use crate::{
    cache::{null::NullDriverCache, redis::RedisDriverCache, DriverCache},
    storage::{redis::RedisDriverStore, DriverStore, StoreTimeouts},
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub store_redis_cfg: RedisConfig,
    pub cache_redis_cfg: RedisConfig,
    pub cache_enabled: bool,
    pub matching_api_key: String,
    /// Milliseconds.
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
    pub default_search_limit: i64,
    /// Seconds.
    pub driver_cache_ttl: u32,
    /// Seconds.
    pub nearby_cache_ttl: u32,
    pub store_timeouts: StoreTimeouts,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedisConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_pool_size: usize,
    pub redis_partition: usize,
    pub reconnect_max_attempts: u32,
    pub reconnect_delay: u32,
    pub default_ttl: u32,
}

impl From<RedisConfig> for RedisSettings {
    fn from(cfg: RedisConfig) -> Self {
        RedisSettings {
            host: cfg.redis_host,
            port: cfg.redis_port,
            partition: cfg.redis_partition,
            pool_size: cfg.redis_pool_size,
            reconnect_max_attempts: cfg.reconnect_max_attempts,
            reconnect_delay: cfg.reconnect_delay,
            default_ttl: cfg.default_ttl,
            ..RedisSettings::default()
        }
    }
}

pub fn read_dhall_config(config_path: &str) -> Result<AppConfig, String> {
    let config = serde_dhall::from_file(config_path).parse::<AppConfig>();
    match config {
        Ok(config) => Ok(config),
        Err(e) => Err(format!("Error reading config: {}", e)),
    }
}

/// Replaces `target` with the parsed value of `name`, absent or unparsable
/// variables leave it untouched.
fn env_override<T: FromStr>(name: &str, target: &mut T) {
    if let Some(value) = var(name).ok().and_then(|value| value.trim().parse::<T>().ok()) {
        *target = value;
    }
}

impl AppConfig {
    pub fn apply_env_overrides(mut self) -> Self {
        env_override("PORT", &mut self.port);
        env_override("HOST", &mut self.host);
        env_override("WORKERS", &mut self.workers);
        env_override("REQUEST_TIMEOUT", &mut self.request_timeout);
        env_override("MAX_ALLOWED_REQ_SIZE", &mut self.max_allowed_req_size);
        env_override("LOG_LEVEL", &mut self.logger_cfg.level);

        env_override("REDIS_HOST", &mut self.cache_redis_cfg.redis_host);
        env_override("REDIS_PORT", &mut self.cache_redis_cfg.redis_port);
        env_override("REDIS_DB", &mut self.cache_redis_cfg.redis_partition);
        env_override("REDIS_POOL_SIZE", &mut self.cache_redis_cfg.redis_pool_size);
        env_override(
            "REDIS_MAX_RETRIES",
            &mut self.cache_redis_cfg.reconnect_max_attempts,
        );
        env_override("REDIS_ENABLED", &mut self.cache_enabled);

        env_override("STORE_REDIS_HOST", &mut self.store_redis_cfg.redis_host);
        env_override("STORE_REDIS_PORT", &mut self.store_redis_cfg.redis_port);
        env_override("STORE_REDIS_DB", &mut self.store_redis_cfg.redis_partition);

        env_override("MATCHING_API_KEY", &mut self.matching_api_key);
        env_override("DEFAULT_SEARCH_LIMIT", &mut self.default_search_limit);
        env_override("DRIVER_CACHE_TTL", &mut self.driver_cache_ttl);
        env_override("NEARBY_CACHE_TTL", &mut self.nearby_cache_ttl);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.matching_api_key.trim().is_empty() {
            return Err("matching_api_key must not be empty".to_string());
        }
        if self.store_redis_cfg.redis_host.trim().is_empty() {
            return Err("store_redis_cfg.redis_host must not be empty".to_string());
        }
        if self.cache_enabled && self.cache_redis_cfg.redis_host.trim().is_empty() {
            return Err("cache_redis_cfg.redis_host must not be empty".to_string());
        }
        if self.default_search_limit <= 0 {
            return Err(format!(
                "default_search_limit ({}) must be positive",
                self.default_search_limit
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub default_limit: i64,
    pub driver_cache_ttl: u32,
    pub nearby_cache_ttl: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            default_limit: 10,
            driver_cache_ttl: 60,
            nearby_cache_ttl: 60,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DriverStore>,
    pub cache: Arc<dyn DriverCache>,
    pub store_redis: Option<Arc<RedisConnectionPool>>,
    pub cache_redis: Option<Arc<RedisConnectionPool>>,
    pub api_key: String,
    pub search: SearchSettings,
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
}

impl AppState {
    pub async fn new(app_config: AppConfig) -> AppState {
        let store_redis = Arc::new(
            RedisConnectionPool::new(app_config.store_redis_cfg.into())
                .await
                .expect("Failed to create Driver Store Redis connection pool"),
        );
        let store: Arc<dyn DriverStore> = Arc::new(RedisDriverStore::new(
            store_redis.clone(),
            app_config.store_timeouts,
        ));

        let (cache, cache_redis): (Arc<dyn DriverCache>, _) = if !app_config.cache_enabled {
            warn!(tag = "[Driver Cache]", "Cache disabled, every lookup goes to the store");
            (Arc::new(NullDriverCache), None)
        } else {
            match RedisConnectionPool::new(app_config.cache_redis_cfg.into()).await {
                Ok(pool) => {
                    let pool = Arc::new(pool);
                    (
                        Arc::new(RedisDriverCache::new(pool.clone())),
                        Some(pool),
                    )
                }
                Err(err) => {
                    warn!(tag = "[Driver Cache]", error = %err.message(), "Cache unreachable, continuing without it");
                    (Arc::new(NullDriverCache), None)
                }
            }
        };

        AppState {
            store,
            cache,
            store_redis: Some(store_redis),
            cache_redis,
            api_key: app_config.matching_api_key,
            search: SearchSettings {
                default_limit: app_config.default_search_limit,
                driver_cache_ttl: app_config.driver_cache_ttl,
                nearby_cache_ttl: app_config.nearby_cache_ttl,
            },
            request_timeout: app_config.request_timeout,
            max_allowed_req_size: app_config.max_allowed_req_size,
        }
    }

    /// State over already built backends, without any Redis pool to close.
    pub fn from_parts(
        store: Arc<dyn DriverStore>,
        cache: Arc<dyn DriverCache>,
        api_key: &str,
        search: SearchSettings,
    ) -> AppState {
        AppState {
            store,
            cache,
            store_redis: None,
            cache_redis: None,
            api_key: api_key.to_string(),
            search,
            request_timeout: 10000,
            max_allowed_req_size: 512000,
        }
    }

    pub async fn close_connections(&self) {
        for pool in [&self.store_redis, &self.cache_redis].into_iter().flatten() {
            pool.close_connections().await;
        }
    }
}
