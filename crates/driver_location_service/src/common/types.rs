/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub use shared::geo::{GeoPoint, Latitude, Longitude};

/// A driver as persisted by the authoritative store.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Driver {
    pub id: String,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// A driver that has not been written yet, `id` may be empty.
    pub fn new(id: String, location: GeoPoint) -> Self {
        let now = Utc::now();
        Driver {
            id,
            location,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DriverWithDistance {
    pub driver: Driver,
    /// Meters from the query center.
    pub distance: f64,
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
}

impl<T> APIResponse<T> {
    pub fn success(data: T) -> Self {
        APIResponse {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: &str) -> Self {
        APIResponse {
            message: Some(message.to_string()),
            ..APIResponse::success(data)
        }
    }
}

impl APIResponse<()> {
    pub fn message(message: &str) -> Self {
        APIResponse {
            success: true,
            data: None,
            error: None,
            message: Some(message.to_string()),
        }
    }

    pub fn failure(error: String, message: String) -> Self {
        APIResponse {
            success: false,
            data: None,
            error: Some(error),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Healthy,
    Unavailable,
    Disabled,
}
