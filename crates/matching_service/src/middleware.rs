/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use std::{collections::HashMap, time::Duration};

use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web::Data,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
pub use shared::middleware::{DomainRootSpanBuilder, IncomingRequestMetrics, RequestGuards};
use tracing::info;

use crate::{environment::AppState, tools::error::AppError};

/// Paths served without a token.
fn is_public_path(path: &str) -> bool {
    path == "/health" || path == "/metrics"
}

/// Identity of the caller, decoded from the bearer token by [`JwtAuth`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub user_id: String,
    pub is_authenticated: bool,
    pub claims: HashMap<String, Value>,
}

impl FromRequest for RequestContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestContext>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string())),
        )
    }
}

/// Id of a caller whose token carries `authenticated: true`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser(pub String);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match req.extensions().get::<RequestContext>() {
            Some(context) if context.is_authenticated => {
                Ok(AuthenticatedUser(context.user_id.to_owned()))
            }
            _ => Err(AppError::Unauthorized("User not authenticated".to_string())),
        })
    }
}

/// Decodes the caller's claims from `Authorization`, the `Bearer ` prefix is optional.
pub fn decode_request_context(
    authorization: Option<&str>,
    jwt_secret: &str,
) -> Result<RequestContext, AppError> {
    let token = authorization
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.required_spec_claims.clear();
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    let claims = decode::<Value>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?
    .claims;

    let claims: HashMap<String, Value> = match claims {
        Value::Object(claims) => claims.into_iter().collect(),
        _ => return Err(AppError::Unauthorized("Invalid token claims".to_string())),
    };

    let is_authenticated = matches!(claims.get("authenticated"), Some(Value::Bool(true)));

    let user_id = claims
        .get("user_id")
        .and_then(Value::as_str)
        .or_else(|| claims.get("sub").and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::Unauthorized("user_id or sub claim is required in JWT".to_string())
        })?;

    Ok(RequestContext {
        user_id,
        is_authenticated,
        claims,
    })
}

/// Rejects requests without a valid HMAC signed bearer token and stores the
/// decoded [`RequestContext`] in the request extensions.
pub struct JwtAuth;

impl<S> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware { service }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: S,
}

fn authenticate(req: &ServiceRequest) -> Result<Option<RequestContext>, AppError> {
    if is_public_path(req.path()) {
        return Ok(None);
    }

    let jwt_secret = req
        .app_data::<Data<AppState>>()
        .map(|data| data.jwt_secret.to_owned())
        .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;

    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|authorization| authorization.to_str().ok());

    decode_request_context(authorization, &jwt_secret).map(Some)
}

impl<S> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(context) => {
                if let Some(context) = context {
                    req.extensions_mut().insert(context);
                }
                Box::pin(self.service.call(req))
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "changeme";

    fn token(claims: Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token")
    }

    fn unauthorized(message: &str) -> AppError {
        AppError::Unauthorized(message.to_string())
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let jwt = token(json!({"user_id": "rider-1", "authenticated": true}), SECRET);

        for header in [format!("Bearer {jwt}"), jwt.to_owned()] {
            let context = decode_request_context(Some(&header), SECRET).expect("context");
            assert_eq!(context.user_id, "rider-1");
            assert!(context.is_authenticated);
        }
    }

    #[test]
    fn sub_is_used_without_user_id() {
        let jwt = token(json!({"sub": "rider-2"}), SECRET);
        let context = decode_request_context(Some(&jwt), SECRET).expect("context");
        assert_eq!(context.user_id, "rider-2");
        assert!(!context.is_authenticated);
    }

    #[test]
    fn non_boolean_authenticated_claim_is_false() {
        let jwt = token(json!({"sub": "rider-3", "authenticated": "true"}), SECRET);
        let context = decode_request_context(Some(&jwt), SECRET).expect("context");
        assert!(!context.is_authenticated);
    }

    #[test]
    fn rejects_bad_tokens() {
        assert_eq!(
            decode_request_context(None, SECRET),
            Err(unauthorized("Missing Authorization header"))
        );
        assert_eq!(
            decode_request_context(Some("Bearer not-a-jwt"), SECRET),
            Err(unauthorized("Invalid or expired token"))
        );

        let wrong_secret = token(json!({"sub": "rider-1"}), "other");
        assert_eq!(
            decode_request_context(Some(&wrong_secret), SECRET),
            Err(unauthorized("Invalid or expired token"))
        );

        let expired = token(json!({"sub": "rider-1", "exp": 1_000_000_000}), SECRET);
        assert_eq!(
            decode_request_context(Some(&expired), SECRET),
            Err(unauthorized("Invalid or expired token"))
        );

        let anonymous = token(json!({"authenticated": true}), SECRET);
        assert_eq!(
            decode_request_context(Some(&anonymous), SECRET),
            Err(unauthorized("user_id or sub claim is required in JWT"))
        );
    }

    #[test]
    fn health_and_metrics_are_public() {
        assert!(is_public_path("/health"));
        assert!(is_public_path("/metrics"));
        assert!(!is_public_path("/api/v1/match"));
    }
}
