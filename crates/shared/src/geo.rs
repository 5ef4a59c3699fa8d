/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

//! GeoJSON compatible points and great-circle distance.

use serde::{Deserialize, Serialize};

/// Radius of Earth in meters.
pub const EARTH_RADIUS_IN_METERS: f64 = 6371000.0;

pub const POINT_KIND: &str = "Point";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Latitude(pub f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Longitude(pub f64);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoPointError {
    #[error("location type must be equal to Point, got {0}")]
    InvalidKind(String),
    #[error("longitude {0} is out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("latitude {0} is out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
}

/// A point serialized exactly like a GeoJSON `Point`:
/// `{"type": "Point", "coordinates": [lon, lat]}`.
///
/// `kind` is kept as a free string so that a well formed body with a wrong
/// type can be rejected by [`GeoPoint::validate`] instead of failing decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        GeoPoint {
            kind: POINT_KIND.to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn lat_lon(&self) -> (Latitude, Longitude) {
        (Latitude(self.latitude()), Longitude(self.longitude()))
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance(&self, other: &GeoPoint) -> f64 {
        distance_between_in_meters(self, other)
    }

    pub fn validate(&self) -> Result<(), GeoPointError> {
        if self.kind != POINT_KIND {
            return Err(GeoPointError::InvalidKind(self.kind.to_owned()));
        }
        let longitude = self.longitude();
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoPointError::LongitudeOutOfRange(longitude));
        }
        let latitude = self.latitude();
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoPointError::LatitudeOutOfRange(latitude));
        }
        Ok(())
    }
}

fn deg2rad(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn distance_between_in_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    // Calculating using haversine formula
    let (Latitude(lat1), Longitude(lon1)) = from.lat_lon();
    let (Latitude(lat2), Longitude(lon2)) = to.lat_lon();

    let dlat = deg2rad(lat2 - lat1);
    let dlon = deg2rad(lon2 - lon1);

    let rlat1 = deg2rad(lat1);
    let rlat2 = deg2rad(lat2);

    let sq = |x: f64| x * x;

    // h stays within [0, 1] up to rounding, clamp it so sqrt(1 - h) is real
    let h = (sq((dlat / 2.0).sin()) + rlat1.cos() * rlat2.cos() * sq((dlon / 2.0).sin()))
        .clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_IN_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}
