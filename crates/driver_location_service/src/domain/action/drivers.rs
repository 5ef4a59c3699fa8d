/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Driver operations over the store and the cache.
//!
//! Validation runs before anything is touched. Every successful mutation
//! drops the per-driver entry it affects and all nearby entries before
//! returning, so no later read can observe the previous state through the
//! cache. Cache failures are logged and never surface to the caller.

use actix_web::web::Data;
use shared::utils::logger::*;

use crate::{
    cache::CacheError,
    cache_lookup,
    common::types::*,
    domain::types::drivers::*,
    environment::AppState,
    tools::error::AppError,
};

fn log_cache_error(operation: &str, err: CacheError) {
    warn!(tag = "[Driver Cache]", operation, error = %err.message());
}

fn validate_location(location: &GeoPoint) -> Result<(), AppError> {
    location
        .validate()
        .map_err(|err| AppError::InvalidRequest(err.to_string()))
}

fn validate_id(id: &str) -> Result<String, AppError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::InvalidRequest(
            "Driver ID is required".to_string(),
        ));
    }
    Ok(id.to_string())
}

async fn invalidate_nearby(data: &AppState) {
    if let Err(err) = data.cache.invalidate_nearby().await {
        log_cache_error("invalidate_nearby", err);
    }
}

async fn forget_driver(data: &AppState, id: &str) {
    if let Err(err) = data.cache.delete(id).await {
        log_cache_error("delete", err);
    }
    invalidate_nearby(data).await;
}

pub async fn create_driver(
    data: Data<AppState>,
    request: CreateDriverRequest,
) -> Result<Driver, AppError> {
    validate_location(&request.location)?;

    let driver = data
        .store
        .create(Driver::new(request.id.trim().to_string(), request.location))
        .await?;

    if let Err(err) = data
        .cache
        .set(&driver.id, &driver, data.search.driver_cache_ttl)
        .await
    {
        log_cache_error("set", err);
    }
    invalidate_nearby(&data).await;

    info!(tag = "[Driver Created]", driver_id = %driver.id);
    Ok(driver)
}

pub async fn batch_create_drivers(
    data: Data<AppState>,
    requests: Vec<CreateDriverRequest>,
) -> Result<DriversData, AppError> {
    if requests.is_empty() {
        return Err(AppError::InvalidRequest(
            "drivers must contain at least one driver".to_string(),
        ));
    }
    for request in &requests {
        validate_location(&request.location)?;
    }

    let drivers = requests
        .into_iter()
        .map(|request| Driver::new(request.id.trim().to_string(), request.location))
        .collect();
    let created = data.store.batch_create(drivers).await?;

    invalidate_nearby(&data).await;

    info!(tag = "[Drivers Created]", count = created.len());
    Ok(created.into())
}

pub async fn get_driver(data: Data<AppState>, id: &str) -> Result<Driver, AppError> {
    let id = validate_id(id)?;

    match data.cache.get(&id).await {
        Ok(Some(driver)) => {
            cache_lookup!("driver", true);
            return Ok(driver);
        }
        Ok(None) => cache_lookup!("driver", false),
        Err(err) => log_cache_error("get", err),
    }

    let driver = data.store.get(&id).await?;

    if let Err(err) = data
        .cache
        .set(&id, &driver, data.search.driver_cache_ttl)
        .await
    {
        log_cache_error("set", err);
    }

    Ok(driver)
}

pub async fn update_driver(
    data: Data<AppState>,
    id: &str,
    request: UpdateDriverRequest,
) -> Result<Driver, AppError> {
    let id = validate_id(id)?;
    validate_location(&request.location)?;

    let driver = data
        .store
        .update(Driver::new(id.to_owned(), request.location))
        .await?;

    forget_driver(&data, &id).await;

    Ok(driver)
}

pub async fn update_driver_location(
    data: Data<AppState>,
    id: &str,
    location: GeoPoint,
) -> Result<Driver, AppError> {
    let id = validate_id(id)?;
    validate_location(&location)?;

    let mut driver = data.store.get(&id).await?;
    driver.location = location;
    driver.updated_at = chrono::Utc::now();
    let driver = data.store.update(driver).await?;

    forget_driver(&data, &id).await;

    Ok(driver)
}

pub async fn delete_driver(data: Data<AppState>, id: &str) -> Result<(), AppError> {
    let id = validate_id(id)?;

    data.store.delete(&id).await?;

    forget_driver(&data, &id).await;

    info!(tag = "[Driver Deleted]", driver_id = %id);
    Ok(())
}

/// Radius and limit actually used for `request`. A missing or non positive
/// limit takes the configured default, any other limit is kept as is.
pub fn effective_search_bounds(
    data: &AppState,
    request: &SearchRequest,
) -> Result<(f64, i64), AppError> {
    let radius = request
        .radius
        .ok_or_else(|| AppError::InvalidRequest("radius is required".to_string()))?;
    if radius.is_nan() || radius <= 0.0 {
        return Err(AppError::InvalidRequest(
            "radius must be greater than 0".to_string(),
        ));
    }

    let limit = if request.limit <= 0 {
        data.search.default_limit
    } else {
        request.limit
    };

    Ok((radius, limit))
}

#[macros::measure_duration]
pub async fn search_nearby_drivers(
    data: Data<AppState>,
    request: SearchRequest,
) -> Result<NearbyDriversData, AppError> {
    validate_location(&request.location)?;
    let (radius, limit) = effective_search_bounds(&data, &request)?;
    let (lat, lon) = request.location.lat_lon();

    match data.cache.get_nearby(&lat, &lon, radius, limit).await {
        Ok(Some(drivers)) => {
            cache_lookup!("nearby", true);
            return Ok(drivers.into());
        }
        Ok(None) => cache_lookup!("nearby", false),
        Err(err) => log_cache_error("get_nearby", err),
    }

    let drivers = data
        .store
        .search_nearby(&request.location, radius, limit as usize)
        .await?;

    if let Err(err) = data
        .cache
        .set_nearby(
            &lat,
            &lon,
            radius,
            limit,
            &drivers,
            data.search.nearby_cache_ttl,
        )
        .await
    {
        log_cache_error("set_nearby", err);
    }

    Ok(drivers.into())
}
