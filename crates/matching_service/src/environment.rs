/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use std::{env::var, str::FromStr, sync::Arc, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use shared::utils::logger::*;

use crate::outbound::{
    circuit_breaker::CircuitBreakerConfig, driver_location::DriverLocationClient,
    RemoteDriverSearch,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub driver_location_base_url: String,
    pub driver_location_api_key: String,
    pub jwt_secret: String,
    /// Milliseconds.
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
    /// Seconds.
    pub upstream_timeout: u64,
    pub breaker_cfg: BreakerConfig,
}

/// Durations are in seconds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct BreakerConfig {
    pub max_requests: u32,
    pub interval: u64,
    pub timeout: u64,
    pub failure_threshold: u32,
}

impl From<BreakerConfig> for CircuitBreakerConfig {
    fn from(cfg: BreakerConfig) -> Self {
        CircuitBreakerConfig {
            max_requests: cfg.max_requests,
            interval: Duration::from_secs(cfg.interval),
            timeout: Duration::from_secs(cfg.timeout),
            failure_threshold: cfg.failure_threshold,
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

        env_override("DRIVER_LOCATION_BASE_URL", &mut self.driver_location_base_url);
        env_override("DRIVER_LOCATION_API_KEY", &mut self.driver_location_api_key);
        env_override("JWT_SECRET", &mut self.jwt_secret);
        env_override("UPSTREAM_TIMEOUT", &mut self.upstream_timeout);

        env_override("BREAKER_MAX_REQUESTS", &mut self.breaker_cfg.max_requests);
        env_override("BREAKER_INTERVAL", &mut self.breaker_cfg.interval);
        env_override("BREAKER_TIMEOUT", &mut self.breaker_cfg.timeout);
        env_override(
            "BREAKER_FAILURE_THRESHOLD",
            &mut self.breaker_cfg.failure_threshold,
        );
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.driver_location_base_url.trim().is_empty() {
            return Err("driver_location_base_url must not be empty".to_string());
        }
        if let Err(err) = Url::parse(&self.driver_location_base_url) {
            return Err(format!(
                "driver_location_base_url ({}) is not a valid url : {err}",
                self.driver_location_base_url
            ));
        }
        if self.jwt_secret.is_empty() {
            return Err("jwt_secret must not be empty".to_string());
        }
        if self.breaker_cfg.max_requests == 0 {
            return Err("breaker_cfg.max_requests must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub driver_search: Arc<dyn RemoteDriverSearch>,
    pub jwt_secret: String,
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
}

impl AppState {
    pub fn new(app_config: AppConfig) -> AppState {
        let client = DriverLocationClient::new(
            &app_config.driver_location_base_url,
            &app_config.driver_location_api_key,
            Duration::from_secs(app_config.upstream_timeout),
            app_config.breaker_cfg.into(),
        )
        .expect("Failed to create Driver Location Service client");

        info!(tag = "[Driver Location Service]", base_url = %app_config.driver_location_base_url, timeout = app_config.upstream_timeout);

        AppState {
            driver_search: Arc::new(client),
            jwt_secret: app_config.jwt_secret,
            request_timeout: app_config.request_timeout,
            max_allowed_req_size: app_config.max_allowed_req_size,
        }
    }

    pub fn from_parts(driver_search: Arc<dyn RemoteDriverSearch>, jwt_secret: &str) -> AppState {
        AppState {
            driver_search,
            jwt_secret: jwt_secret.to_string(),
            request_timeout: 40000,
            max_allowed_req_size: 512000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            port: 8087,
            host: "0.0.0.0".to_string(),
            workers: 1,
            logger_cfg: LoggerConfig {
                level: LogLevel::INFO,
                log_to_file: false,
            },
            driver_location_base_url: "http://localhost:8086".to_string(),
            driver_location_api_key: "changeme".to_string(),
            jwt_secret: "changeme".to_string(),
            request_timeout: 40000,
            max_allowed_req_size: 512000,
            upstream_timeout: 30,
            breaker_cfg: BreakerConfig {
                max_requests: 3,
                interval: 60,
                timeout: 10,
                failure_threshold: 5,
            },
        }
    }

    #[test]
    fn validation_rejects_bad_configs() {
        assert!(config().validate().is_ok());

        let mut cfg = config();
        cfg.driver_location_base_url = " ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.driver_location_base_url = "localhost without scheme".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.jwt_secret = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn breaker_settings_are_seconds() {
        let breaker: CircuitBreakerConfig = config().breaker_cfg.into();
        assert_eq!(breaker, CircuitBreakerConfig::default());
    }
}
