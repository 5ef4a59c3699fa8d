/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use std::time::Duration;

use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web::Data,
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
pub use shared::middleware::{DomainRootSpanBuilder, IncomingRequestMetrics, RequestGuards};
use tracing::info;

use crate::{environment::AppState, tools::error::AppError};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Paths served without an API key.
fn is_public_path(path: &str) -> bool {
    path == "/" || path == "/health" || path == "/metrics" || path.starts_with("/swagger/")
}

/// Rejects requests whose `X-API-Key` does not match the configured key.
///
/// Both sides are trimmed before a case sensitive comparison. A rejected
/// request never reaches its handler.
pub struct ApiKeyAuth;

impl<S> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddleware { service }))
    }
}

pub struct ApiKeyAuthMiddleware<S> {
    service: S,
}

fn check_api_key(req: &ServiceRequest) -> Result<(), AppError> {
    if is_public_path(req.path()) {
        return Ok(());
    }

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|api_key| api_key.to_str().ok())
        .map(str::trim)
        .filter(|api_key| !api_key.is_empty())
        .ok_or(AppError::MissingApiKey)?;

    let expected = req
        .app_data::<Data<AppState>>()
        .map(|data| data.api_key.trim().to_string())
        .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;

    if provided == expected {
        Ok(())
    } else {
        Err(AppError::InvalidApiKey)
    }
}

impl<S> Service<ServiceRequest> for ApiKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match check_api_key(&req) {
            Ok(()) => Box::pin(self.service.call(req)),
            Err(err) => {
                info!(tag = "[Unauthorized Request]", request_path = %req.path(), error = %err.message());
                Box::pin(ready(Ok(req.error_response(err))))
            }
        }
    }
}

/// Request budget of [`AppState::request_timeout`], answered with `408`.
pub type RequestTimeout = shared::middleware::RequestTimeout<AppState>;

/// Body limit of [`AppState::max_allowed_req_size`], answered with `413`.
pub type CheckContentLength = shared::middleware::CheckContentLength<AppState>;

impl RequestGuards for AppState {
    type Error = AppError;

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    fn max_allowed_req_size(&self) -> usize {
        self.max_allowed_req_size
    }

    fn timed_out(&self) -> AppError {
        AppError::RequestTimeout
    }

    fn payload_too_large(&self, content_length: usize, limit: usize) -> AppError {
        AppError::LargePayloadSize(content_length, limit)
    }
}
