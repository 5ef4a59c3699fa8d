/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::web::Data;
use tracing::info;

use crate::{
    common::types::{MatchResult, Rider},
    domain::types::{
        matching::{MatchRequest, MatchResponse},
        validation::validate_match_request,
    },
    environment::AppState,
    outbound::RemoteDriverSearch,
    tools::error::AppError,
};

/// Pairs the authenticated rider with the nearest driver within the radius.
#[macros::measure_duration]
pub async fn match_rider(
    data: Data<AppState>,
    rider_id: String,
    request: MatchRequest,
) -> Result<MatchResponse, AppError> {
    let request = validate_match_request(request).map_err(AppError::ValidationFailed)?;

    let rider = Rider {
        id: rider_id,
        location: request.location,
    };

    let result = find_nearest_driver(data.driver_search.as_ref(), &rider, request.radius).await?;

    info!(tag = "[Rider Matched]", rider_id = %result.rider_id, driver_id = %result.driver_id, distance = result.distance);

    Ok(result.into())
}

/// Upstream results are nearest first, the first one wins.
pub async fn find_nearest_driver(
    driver_search: &dyn RemoteDriverSearch,
    rider: &Rider,
    radius: f64,
) -> Result<MatchResult, AppError> {
    let drivers = driver_search
        .find_nearby_drivers(&rider.location, radius)
        .await?;

    let nearest = drivers.into_iter().next().ok_or(AppError::NoDriversFound)?;

    Ok(MatchResult {
        rider_id: rider.id.to_owned(),
        driver_id: nearest.driver.id,
        distance: round_to_centimeters(nearest.distance),
    })
}

fn round_to_centimeters(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}
