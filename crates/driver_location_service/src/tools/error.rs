/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};

use crate::{common::types::APIResponse, storage::StoreError};

#[macros::add_error]
pub enum AppError {
    InternalError(String),
    InvalidRequest(String),
    DriverNotFound(String),
    DriverAlreadyExists(String),
    StoreUnavailable(String),
    StoreTimeout(String),
    BatchCreateFailed(String),
    MissingApiKey,
    InvalidApiKey,
    RequestTimeout,
    LargePayloadSize(usize, usize),
}

impl AppError {
    fn error_message(&self) -> APIResponse<()> {
        APIResponse::failure(self.code(), self.message())
    }

    pub fn message(&self) -> String {
        match self {
            AppError::InternalError(err) => err.to_string(),
            AppError::InvalidRequest(err) => err.to_string(),
            AppError::DriverNotFound(_) => "Driver not found".to_string(),
            AppError::DriverAlreadyExists(id) => format!("Driver already exists : {id}"),
            AppError::StoreUnavailable(err) => format!("Driver store unavailable : {err}"),
            AppError::StoreTimeout(operation) => {
                format!("Driver store timed out during {operation}")
            }
            AppError::BatchCreateFailed(err) => format!("failed to batch create drivers: {err}"),
            AppError::MissingApiKey => "API key is required".to_string(),
            AppError::InvalidApiKey => "Invalid API key".to_string(),
            AppError::RequestTimeout => "Request timed out".to_string(),
            AppError::LargePayloadSize(length, limit) => {
                format!("Content length ({length} Bytes) greater than allowed maximum limit : ({limit} Bytes)")
            }
        }
    }

    pub fn code(&self) -> String {
        match self {
            AppError::InternalError(_) => "internal_error",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::DriverNotFound(_) => "not_found",
            AppError::DriverAlreadyExists(_) => "conflict",
            AppError::StoreUnavailable(_) => "internal_error",
            AppError::StoreTimeout(_) => "internal_error",
            AppError::BatchCreateFailed(_) => "internal_error",
            AppError::MissingApiKey => "unauthorized",
            AppError::InvalidApiKey => "unauthorized",
            AppError::RequestTimeout => "request_timeout",
            AppError::LargePayloadSize(_, _) => "payload_too_large",
        }
        .to_string()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.error_message())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DriverNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DriverAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BatchCreateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingApiKey => StatusCode::UNAUTHORIZED,
            AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::LargePayloadSize(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => AppError::DriverNotFound(id),
            StoreError::Conflict(id) => AppError::DriverAlreadyExists(id),
            StoreError::Unavailable(err) => AppError::StoreUnavailable(err),
            StoreError::Timeout(operation) => AppError::StoreTimeout(operation),
            StoreError::Batch(err) => AppError::BatchCreateFailed(err),
            StoreError::Corrupted(err) => AppError::InternalError(err),
        }
    }
}
