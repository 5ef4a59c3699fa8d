/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use serde::{Deserialize, Serialize};

pub use shared::geo::GeoPoint;

/// A driver as reported by the driver location service. Timestamps are
/// passed through untouched.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Driver {
    pub id: String,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct NearbyDriver {
    pub driver: Driver,
    /// Meters from the rider.
    pub distance: f64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Rider {
    pub id: String,
    pub location: GeoPoint,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub rider_id: String,
    pub driver_id: String,
    pub distance: f64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Response envelope shared by every endpoint of the service.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct APIResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> APIResponse<T> {
    pub fn success(data: T) -> Self {
        APIResponse {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            details: None,
        }
    }
}

impl APIResponse<()> {
    pub fn failure(error: String, message: String, details: Option<serde_json::Value>) -> Self {
        APIResponse {
            success: false,
            data: None,
            error: Some(error),
            message: Some(message),
            details,
        }
    }
}
