/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    delete, get, patch, post, put,
    web::{Data, Json, Path},
    HttpResponse,
};

use crate::{
    common::types::*,
    domain::{action::drivers, types::drivers::*},
    environment::AppState,
    tools::error::AppError,
};

#[post("/api/v1/drivers")]
pub async fn create_drivers(
    data: Data<AppState>,
    param_obj: Json<CreateDriversBody>,
) -> Result<HttpResponse, AppError> {
    let response = match param_obj.into_inner() {
        CreateDriversBody::Single(request) => {
            let driver = drivers::create_driver(data, request).await?;
            HttpResponse::Created().json(APIResponse::success_with_message(
                driver,
                "Driver created successfully",
            ))
        }
        CreateDriversBody::Many(requests)
        | CreateDriversBody::Batch(BatchCreateRequest { drivers: requests }) => {
            let created = drivers::batch_create_drivers(data, requests).await?;
            HttpResponse::Created().json(APIResponse::success_with_message(
                created,
                "Drivers created successfully",
            ))
        }
    };

    Ok(response)
}

#[post("/api/v1/drivers/batch")]
pub async fn batch_create_drivers(
    data: Data<AppState>,
    param_obj: Json<BatchCreateRequest>,
) -> Result<HttpResponse, AppError> {
    let created = drivers::batch_create_drivers(data, param_obj.into_inner().drivers).await?;

    Ok(HttpResponse::Created().json(APIResponse::success_with_message(
        created,
        "Drivers created successfully",
    )))
}

#[post("/api/v1/drivers/search")]
pub async fn search_nearby_drivers(
    data: Data<AppState>,
    param_obj: Json<SearchRequest>,
) -> Result<Json<APIResponse<NearbyDriversData>>, AppError> {
    Ok(Json(APIResponse::success(
        drivers::search_nearby_drivers(data, param_obj.into_inner()).await?,
    )))
}

#[get("/api/v1/drivers/{id}")]
pub async fn get_driver(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<APIResponse<Driver>>, AppError> {
    Ok(Json(APIResponse::success(
        drivers::get_driver(data, &path.into_inner()).await?,
    )))
}

#[put("/api/v1/drivers/{id}")]
pub async fn update_driver(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<UpdateDriverRequest>,
) -> Result<Json<APIResponse<Driver>>, AppError> {
    Ok(Json(APIResponse::success(
        drivers::update_driver(data, &path.into_inner(), param_obj.into_inner()).await?,
    )))
}

#[patch("/api/v1/drivers/{id}/location")]
pub async fn update_driver_location(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<GeoPoint>,
) -> Result<Json<APIResponse<Driver>>, AppError> {
    let driver =
        drivers::update_driver_location(data, &path.into_inner(), param_obj.into_inner()).await?;

    Ok(Json(APIResponse::success_with_message(
        driver,
        "Driver location updated successfully",
    )))
}

#[delete("/api/v1/drivers/{id}")]
pub async fn delete_driver(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<APIResponse<()>>, AppError> {
    drivers::delete_driver(data, &path.into_inner()).await?;

    Ok(Json(APIResponse::message("Driver deleted successfully")))
}
