/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use shared::utils::callapi::call_api;
use tracing::warn;

use super::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    RemoteDriverSearch, UpstreamError,
};
use crate::common::types::{APIResponse, GeoPoint, NearbyDriver};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const SEARCH_PATH: &str = "/api/v1/drivers/search";

#[derive(Serialize, Debug)]
struct SearchNearbyRequest<'a> {
    location: &'a GeoPoint,
    radius: f64,
}

#[derive(serde::Deserialize)]
struct SearchNearbyData {
    drivers: Vec<NearbyDriver>,
}

/// HTTP client of the driver location service, every call goes through a
/// circuit breaker.
pub struct DriverLocationClient {
    client: Client,
    search_url: Url,
    api_key: String,
    breaker: CircuitBreaker,
}

impl DriverLocationClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        breaker_config: CircuitBreakerConfig,
    ) -> Result<Self, String> {
        let search_url = Url::parse(&format!("{}{SEARCH_PATH}", base_url.trim_end_matches('/')))
            .map_err(|err| format!("Invalid driver location base url {base_url} : {err}"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("Failed to build http client : {err}"))?;

        Ok(DriverLocationClient {
            client,
            search_url,
            api_key: api_key.to_string(),
            breaker: CircuitBreaker::new("driver-location-service", breaker_config),
        })
    }

    async fn search(&self, location: &GeoPoint, radius: f64) -> Result<Vec<NearbyDriver>, UpstreamError> {
        let response: APIResponse<serde_json::Value> = call_api(
            &self.client,
            Method::POST,
            &self.search_url,
            vec![(API_KEY_HEADER, self.api_key.as_str())],
            Some(SearchNearbyRequest { location, radius }),
        )
        .await?;

        unwrap_search_response(response)
    }
}

fn unwrap_search_response(
    response: APIResponse<serde_json::Value>,
) -> Result<Vec<NearbyDriver>, UpstreamError> {
    if !response.success {
        return Err(UpstreamError::Rejected(
            response.error.unwrap_or_default(),
            response.message.unwrap_or_default(),
        ));
    }

    let data = response
        .data
        .ok_or_else(|| UpstreamError::InvalidPayload("missing data".to_string()))?;

    serde_json::from_value::<SearchNearbyData>(data)
        .map(|data| data.drivers)
        .map_err(|err| UpstreamError::InvalidPayload(err.to_string()))
}

#[async_trait]
impl RemoteDriverSearch for DriverLocationClient {
    async fn find_nearby_drivers(
        &self,
        location: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<NearbyDriver>, UpstreamError> {
        self.breaker
            .call(|| self.search(location, radius))
            .await
            .map_err(|err| {
                let err = UpstreamError::from(err);
                warn!(tag = "[Driver Location Service]", error = %err.message());
                err
            })
    }

    fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.breaker.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> APIResponse<serde_json::Value> {
        serde_json::from_value(value).expect("envelope")
    }

    #[test]
    fn search_url_is_joined_once() {
        let client = DriverLocationClient::new(
            "http://localhost:8086/",
            "key",
            Duration::from_secs(5),
            CircuitBreakerConfig::default(),
        )
        .expect("client");
        assert_eq!(
            client.search_url.as_str(),
            "http://localhost:8086/api/v1/drivers/search"
        );
        assert!(DriverLocationClient::new(
            "not a url",
            "key",
            Duration::from_secs(5),
            CircuitBreakerConfig::default()
        )
        .is_err());
    }

    #[test]
    fn drivers_are_read_from_data() {
        let drivers = unwrap_search_response(envelope(json!({
            "success": true,
            "data": {
                "drivers": [{
                    "driver": {
                        "id": "d1",
                        "location": {"type": "Point", "coordinates": [29.0, 41.0]},
                        "created_at": "2024-01-01T00:00:00Z",
                        "updated_at": "2024-01-01T00:00:00Z"
                    },
                    "distance": 12.5
                }],
                "count": 1
            }
        })))
        .expect("drivers");

        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].driver.id, "d1");
        assert_eq!(drivers[0].distance, 12.5);
    }

    #[test]
    fn unsuccessful_envelope_is_rejected() {
        let err = unwrap_search_response(envelope(json!({
            "success": false,
            "error": "invalid_request",
            "message": "radius must be greater than 0"
        })))
        .expect_err("rejected");

        assert_eq!(
            err.message(),
            "driver location service error: invalid_request - radius must be greater than 0"
        );
    }

    #[test]
    fn unexpected_data_shape_is_invalid_payload() {
        let err = unwrap_search_response(envelope(json!({
            "success": true,
            "data": [1, 2, 3]
        })))
        .expect_err("invalid");
        assert!(matches!(err, UpstreamError::InvalidPayload(_)));

        let err = unwrap_search_response(envelope(json!({"success": true})))
            .expect_err("missing");
        assert!(matches!(err, UpstreamError::InvalidPayload(_)));
    }
}
