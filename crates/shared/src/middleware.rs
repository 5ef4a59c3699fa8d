/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Request middlewares common to every service.
//!
//! [`RequestTimeout`] and [`CheckContentLength`] read their limits from the
//! service state registered as `web::Data<T>`, and answer with the service's
//! own error type through [`RequestGuards`]. Without that state registered
//! they let every request through.

use std::{marker::PhantomData, time::Duration};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header::CONTENT_LENGTH, StatusCode},
    web::Data,
    Error, HttpRequest, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use tokio::time::{timeout, Instant};
use tracing::{error, info, Span};
use tracing_actix_web::{DefaultRootSpanBuilder, RootSpanBuilder};
use uuid::Uuid;

use crate::incoming_api;

/// Limits a service state imposes on every request, and the errors it answers with.
pub trait RequestGuards: 'static {
    type Error: ResponseError + 'static;

    fn request_timeout(&self) -> Duration;

    /// Bytes.
    fn max_allowed_req_size(&self) -> usize;

    fn timed_out(&self) -> Self::Error;

    fn payload_too_large(&self, content_length: usize, limit: usize) -> Self::Error;
}

/// Fails the request once `T::request_timeout` has elapsed. The handler
/// future is dropped, which cancels every downstream call it was waiting on.
pub struct RequestTimeout<T>(PhantomData<fn() -> T>);

impl<T> Default for RequestTimeout<T> {
    fn default() -> Self {
        RequestTimeout(PhantomData)
    }
}

impl<S, T> Transform<S, ServiceRequest> for RequestTimeout<T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
    T: RequestGuards,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTimeoutMiddleware<S, T>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTimeoutMiddleware {
            service,
            state: PhantomData,
        }))
    }
}

pub struct RequestTimeoutMiddleware<S, T> {
    service: S,
    state: PhantomData<fn() -> T>,
}

impl<S, T> Service<ServiceRequest> for RequestTimeoutMiddleware<S, T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
    T: RequestGuards,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match req.app_data::<Data<T>>().cloned() {
            Some(data) => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    match timeout(data.request_timeout(), fut).await {
                        Ok(res) => res,
                        Err(_) => Err(Error::from(data.timed_out())),
                    }
                })
            }
            None => Box::pin(self.service.call(req)),
        }
    }
}

/// Rejects bodies whose declared `Content-Length` is above `T::max_allowed_req_size`.
pub struct CheckContentLength<T>(PhantomData<fn() -> T>);

impl<T> Default for CheckContentLength<T> {
    fn default() -> Self {
        CheckContentLength(PhantomData)
    }
}

impl<S, T> Transform<S, ServiceRequest> for CheckContentLength<T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
    T: RequestGuards,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CheckContentLengthMiddleware<S, T>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CheckContentLengthMiddleware {
            service,
            state: PhantomData,
        }))
    }
}

pub struct CheckContentLengthMiddleware<S, T> {
    service: S,
    state: PhantomData<fn() -> T>,
}

/// `Some((declared, limit))` when the declared body is over the limit.
fn oversized(declared: Option<usize>, limit: Option<usize>) -> Option<(usize, usize)> {
    match (declared, limit) {
        (Some(declared), Some(limit)) if declared > limit => Some((declared, limit)),
        _ => None,
    }
}

impl<S, T> Service<ServiceRequest> for CheckContentLengthMiddleware<S, T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
    T: RequestGuards,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|content_length| content_length.to_str().ok()?.parse::<usize>().ok());
        let data = req.app_data::<Data<T>>().cloned();
        let limit = data.as_ref().map(|data| data.max_allowed_req_size());

        match (oversized(declared, limit), data) {
            (Some((declared, limit)), Some(data)) => {
                let err = data.payload_too_large(declared, limit);
                Box::pin(ready(Ok(req.error_response(err))))
            }
            _ => Box::pin(self.service.call(req)),
        }
    }
}

/// Root span of every request, keyed by `x-request-id` when the caller sent one.
pub struct DomainRootSpanBuilder;

impl RootSpanBuilder for DomainRootSpanBuilder {
    fn on_request_start(request: &ServiceRequest) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|request_id| request_id.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        tracing_actix_web::root_span!(request, request_id)
    }

    fn on_request_end<B: MessageBody>(span: Span, outcome: &Result<ServiceResponse<B>, Error>) {
        DefaultRootSpanBuilder::on_request_end(span, outcome);
    }
}

/// Logs every request with its latency and observes `http_request_duration_seconds`.
pub struct IncomingRequestMetrics;

impl<S> Transform<S, ServiceRequest> for IncomingRequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = IncomingRequestMetricsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IncomingRequestMetricsMiddleware { service }))
    }
}

pub struct IncomingRequestMetricsMiddleware<S> {
    service: S,
}

impl<S> Service<ServiceRequest> for IncomingRequestMetricsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = route_template(req.request());

        let fut = self.service.call(req);
        Box::pin(async move {
            let outcome = fut.await;
            match &outcome {
                Ok(response) => record_request(
                    &method,
                    &path,
                    response.status(),
                    response.response().error(),
                    started,
                ),
                Err(err) => record_request(
                    &method,
                    &path,
                    err.error_response().status(),
                    Some(err),
                    started,
                ),
            }
            outcome
        })
    }
}

/// `/api/v1/drivers/d1` is reported as `/api/v1/drivers/{id}`.
fn route_template(request: &HttpRequest) -> String {
    request
        .match_pattern()
        .unwrap_or_else(|| request.path().to_string())
}

fn record_request(
    method: &str,
    path: &str,
    status: StatusCode,
    err: Option<&Error>,
    started: Instant,
) {
    let latency = format!("{}ms", started.elapsed().as_millis());
    match err {
        Some(err) => {
            let code = err.to_string();
            error!(tag = "[INCOMING API - ERROR]", request_method = %method, request_path = %path, response_code = %code, response_status = status.as_str(), %latency);
            incoming_api!(method, path, status.as_str(), code.as_str(), started);
        }
        None => {
            info!(tag = "[INCOMING API]", request_method = %method, request_path = %path, response_status = status.as_str(), %latency);
            incoming_api!(method, path, status.as_str(), "SUCCESS", started);
        }
    }
}
