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
use serde_json::json;

use crate::{
    common::types::{APIResponse, FieldError},
    outbound::UpstreamError,
};

#[macros::add_error]
pub enum AppError {
    InternalError(String),
    InvalidRequest(String),
    ValidationFailed(Vec<FieldError>),
    Unauthorized(String),
    NoDriversFound,
    UpstreamFailed(String),
    RequestTimeout,
    LargePayloadSize(usize, usize),
}

impl AppError {
    fn error_message(&self) -> APIResponse<()> {
        let details = match self {
            AppError::ValidationFailed(errors) => Some(json!({ "errors": errors })),
            _ => None,
        };
        APIResponse::failure(self.code(), self.message(), details)
    }

    pub fn message(&self) -> String {
        match self {
            AppError::InternalError(err) => err.to_string(),
            AppError::InvalidRequest(err) => err.to_string(),
            AppError::ValidationFailed(_) => "Request validation failed".to_string(),
            AppError::Unauthorized(err) => err.to_string(),
            AppError::NoDriversFound => "No drivers found nearby".to_string(),
            AppError::UpstreamFailed(err) => format!("failed to find nearby drivers: {err}"),
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
            AppError::ValidationFailed(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NoDriversFound => "not_found",
            AppError::UpstreamFailed(_) => "internal_error",
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
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NoDriversFound => StatusCode::NOT_FOUND,
            AppError::UpstreamFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::LargePayloadSize(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::UpstreamFailed(err.message())
    }
}
