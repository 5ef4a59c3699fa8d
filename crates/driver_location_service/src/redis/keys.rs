/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::{Latitude, Longitude};

// Authoritative store
pub fn driver_details_key(driver_id: &str) -> String {
    format!("dls:driver:{driver_id}")
}

pub fn drivers_geo_index_key() -> String {
    "dls:drivers:geo".to_string()
}

pub fn drivers_sequence_key() -> String {
    "dls:drivers:seq".to_string()
}

// Cache
pub fn driver_cache_key(driver_id: &str) -> String {
    format!("dls:cache:driver:{driver_id}")
}

pub fn nearby_cache_prefix() -> String {
    "dls:cache:nearby:".to_string()
}

/// Equivalent queries coalesce: coordinates are fixed to 6 decimals (~0.1 m)
/// and the radius to whole meters.
pub fn nearby_fingerprint(lat: &Latitude, lon: &Longitude, radius: f64, limit: i64) -> String {
    let (Latitude(lat), Longitude(lon)) = (lat, lon);
    format!("{lat:.6}:{lon:.6}:{radius:.0}:{limit}")
}

pub fn nearby_cache_key(lat: &Latitude, lon: &Longitude, radius: f64, limit: i64) -> String {
    format!(
        "{}{}",
        nearby_cache_prefix(),
        nearby_fingerprint(lat, lon, radius, limit)
    )
}
