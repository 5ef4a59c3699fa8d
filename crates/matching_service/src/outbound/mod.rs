/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod circuit_breaker;
pub mod driver_location;

use async_trait::async_trait;
use shared::utils::callapi::CallAPIError;

use self::circuit_breaker::{BreakerError, CircuitState};
use crate::common::types::{GeoPoint, NearbyDriver};

#[macros::add_error]
pub enum UpstreamError {
    Unavailable(CircuitState),
    RequestFailed(String),
    Rejected(String, String),
    InvalidPayload(String),
}

impl UpstreamError {
    pub fn message(&self) -> String {
        match self {
            UpstreamError::Unavailable(state) => {
                format!("driver location service unavailable: circuit breaker is {state}")
            }
            UpstreamError::RequestFailed(err) => err.to_string(),
            UpstreamError::Rejected(error, message) => {
                format!("driver location service error: {error} - {message}")
            }
            UpstreamError::InvalidPayload(err) => {
                format!("invalid response from driver location service: {err}")
            }
        }
    }
}

impl From<CallAPIError> for UpstreamError {
    fn from(err: CallAPIError) -> Self {
        match err {
            CallAPIError::DeserializationError(err) => UpstreamError::InvalidPayload(err),
            err => UpstreamError::RequestFailed(err.message()),
        }
    }
}

impl From<BreakerError<UpstreamError>> for UpstreamError {
    fn from(err: BreakerError<UpstreamError>) -> Self {
        match err {
            BreakerError::Rejected(state) => UpstreamError::Unavailable(state),
            BreakerError::Failed(err) => err,
        }
    }
}

/// Nearest-driver lookup backed by another service.
#[async_trait]
pub trait RemoteDriverSearch: Send + Sync {
    /// Drivers within `radius` meters of `location`, nearest first.
    async fn find_nearby_drivers(
        &self,
        location: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<NearbyDriver>, UpstreamError>;

    /// Current breaker state, `None` when the backend is not guarded by one.
    fn circuit_state(&self) -> Option<CircuitState> {
        None
    }
}
