/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use serde::{Deserialize, Serialize};

use crate::common::types::{GeoPoint, MatchResult};

/// Body of `POST /api/v1/match`. Both fields are optional at decode time so
/// that a missing field is reported as a validation error.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MatchRequest {
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Meters.
    #[serde(default)]
    pub radius: Option<f64>,
}

/// A [`MatchRequest`] that passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidMatchRequest {
    pub location: GeoPoint,
    pub radius: f64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MatchResponse {
    pub driver: String,
    pub rider: String,
    pub distance: f64,
}

impl From<MatchResult> for MatchResponse {
    fn from(result: MatchResult) -> Self {
        MatchResponse {
            driver: result.driver_id,
            rider: result.rider_id,
            distance: result.distance,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct HealthCheckResponse {
    pub status: String,
    pub service: String,
}
