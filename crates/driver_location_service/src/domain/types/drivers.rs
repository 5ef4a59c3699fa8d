/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use serde::{Deserialize, Serialize};

use crate::common::types::*;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CreateDriverRequest {
    #[serde(default)]
    pub id: String,
    pub location: GeoPoint,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BatchCreateRequest {
    pub drivers: Vec<CreateDriverRequest>,
}

/// `POST /api/v1/drivers` takes one driver, a bare array or a batch object.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum CreateDriversBody {
    Many(Vec<CreateDriverRequest>),
    Batch(BatchCreateRequest),
    Single(CreateDriverRequest),
}

/// Body of `PUT /api/v1/drivers/{id}`, the path id wins over `id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpdateDriverRequest {
    #[serde(default)]
    pub id: String,
    pub location: GeoPoint,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub location: GeoPoint,
    /// Meters, required and rejected with `400` when absent.
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub limit: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DriversData {
    pub drivers: Vec<Driver>,
    pub count: usize,
}

impl From<Vec<Driver>> for DriversData {
    fn from(drivers: Vec<Driver>) -> Self {
        DriversData {
            count: drivers.len(),
            drivers,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NearbyDriversData {
    pub drivers: Vec<DriverWithDistance>,
    pub count: usize,
}

impl From<Vec<DriverWithDistance>> for NearbyDriversData {
    fn from(drivers: Vec<DriverWithDistance>) -> Self {
        NearbyDriversData {
            count: drivers.len(),
            drivers,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthCheckResponse {
    pub status: String,
    pub service: String,
    pub cache: CacheStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_accepts_every_shape() {
        let single: CreateDriversBody = serde_json::from_str(
            r#"{"id":"d1","location":{"type":"Point","coordinates":[29,41]}}"#,
        )
        .expect("single");
        assert!(matches!(single, CreateDriversBody::Single(ref driver) if driver.id == "d1"));

        let many: CreateDriversBody = serde_json::from_str(
            r#"[{"location":{"type":"Point","coordinates":[29,41]}},{"id":"d2","location":{"type":"Point","coordinates":[30,40]}}]"#,
        )
        .expect("many");
        assert!(matches!(many, CreateDriversBody::Many(ref drivers) if drivers.len() == 2));

        let batch: CreateDriversBody = serde_json::from_str(
            r#"{"drivers":[{"location":{"type":"Point","coordinates":[29,41]}}]}"#,
        )
        .expect("batch");
        assert!(matches!(batch, CreateDriversBody::Batch(ref batch) if batch.drivers.len() == 1));

        assert!(serde_json::from_str::<CreateDriversBody>(r#"{"id":"d1"}"#).is_err());
    }

    #[test]
    fn search_request_leaves_missing_fields_to_validation() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"location":{"type":"Point","coordinates":[10,10]}}"#)
                .expect("search");
        assert_eq!(request.radius, None);
        assert_eq!(request.limit, 0);
    }
}
