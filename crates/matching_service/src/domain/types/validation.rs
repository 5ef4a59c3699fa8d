/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use shared::geo::{GeoPointError, POINT_KIND};

use super::matching::{MatchRequest, ValidMatchRequest};
use crate::common::types::FieldError;

pub const MIN_RADIUS: f64 = 0.1;
pub const MAX_RADIUS: f64 = 50000.0;

fn field_error(field: &str, message: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Checks every field and reports all failures at once.
pub fn validate_match_request(request: MatchRequest) -> Result<ValidMatchRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    match &request.location {
        None => errors.push(field_error("location", "location is required")),
        Some(location) => match location.validate() {
            Ok(()) => {}
            Err(GeoPointError::InvalidKind(_)) => errors.push(field_error(
                "location.type",
                &format!("location type must be equal to {POINT_KIND}"),
            )),
            Err(_) => errors.push(field_error(
                "location.coordinates",
                "location coordinates are invalid (longitude: -180 to 180, latitude: -90 to 90)",
            )),
        },
    }

    match request.radius {
        None => errors.push(field_error("radius", "radius is required")),
        Some(radius) if !(MIN_RADIUS..=MAX_RADIUS).contains(&radius) => errors.push(field_error(
            "radius",
            "radius must be between 0.1 and 50000 meters",
        )),
        Some(_) => {}
    }

    match (request.location, request.radius) {
        (Some(location), Some(radius)) if errors.is_empty() => {
            Ok(ValidMatchRequest { location, radius })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::GeoPoint;

    fn request(location: Option<GeoPoint>, radius: Option<f64>) -> MatchRequest {
        MatchRequest { location, radius }
    }

    fn fields(errors: Vec<FieldError>) -> Vec<String> {
        errors.into_iter().map(|err| err.field).collect()
    }

    #[test]
    fn accepts_radius_bounds() {
        for radius in [0.1, 500.0, 50000.0] {
            let valid = validate_match_request(request(Some(GeoPoint::new(29.0, 41.0)), Some(radius)))
                .expect("valid");
            assert_eq!(valid.radius, radius);
        }
    }

    #[test]
    fn rejects_radius_out_of_bounds() {
        for radius in [0.0, 0.09, -5.0, 50000.1, f64::NAN] {
            let errors = validate_match_request(request(Some(GeoPoint::new(29.0, 41.0)), Some(radius)))
                .expect_err("invalid");
            assert_eq!(
                errors,
                vec![field_error("radius", "radius must be between 0.1 and 50000 meters")]
            );
        }
    }

    #[test]
    fn rejects_bad_location() {
        let errors = validate_match_request(request(Some(GeoPoint::new(181.0, 41.0)), Some(500.0)))
            .expect_err("invalid");
        assert_eq!(fields(errors), vec!["location.coordinates"]);

        let polygon = GeoPoint {
            kind: "Polygon".to_string(),
            coordinates: [29.0, 41.0],
        };
        let errors = validate_match_request(request(Some(polygon), Some(500.0))).expect_err("invalid");
        assert_eq!(
            errors,
            vec![field_error("location.type", "location type must be equal to Point")]
        );
    }

    #[test]
    fn reports_every_missing_field() {
        let errors = validate_match_request(request(None, None)).expect_err("invalid");
        assert_eq!(fields(errors), vec!["location", "radius"]);
    }
}
