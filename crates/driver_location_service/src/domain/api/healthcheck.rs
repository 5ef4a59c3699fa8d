/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    get,
    web::{Data, Json},
};

use shared::utils::logger::*;

use crate::{
    common::types::CacheStatus, domain::types::drivers::HealthCheckResponse,
    environment::AppState,
};

#[get("/health")]
pub async fn health_check(data: Data<AppState>) -> Json<HealthCheckResponse> {
    let cache = if !data.cache.is_enabled() {
        CacheStatus::Disabled
    } else if data.cache.is_healthy().await {
        CacheStatus::Healthy
    } else {
        CacheStatus::Unavailable
    };
    if cache == CacheStatus::Unavailable {
        warn!(tag = "[Health Check]", %cache, "Driver cache is not answering");
    }

    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        service: "driver-location-service".to_string(),
        cache,
    })
}
