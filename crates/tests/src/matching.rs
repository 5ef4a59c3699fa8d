/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use actix_http::Request;
use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    post,
    test::{self, TestRequest},
    web, App, Error, HttpRequest, HttpResponse, HttpServer,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use matching_service::{
    domain::api,
    environment::AppState,
    middleware::{JwtAuth, RequestTimeout},
    outbound::{circuit_breaker::CircuitBreakerConfig, driver_location::DriverLocationClient},
    tools::error::AppError,
};
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";
const UPSTREAM_API_KEY: &str = "upstream-key";

#[derive(Clone, Copy)]
enum Upstream {
    Drivers,
    Empty,
    Broken,
}

struct StubState {
    mode: Upstream,
    hits: AtomicUsize,
}

/// Location Service stand-in answering the nearby search.
#[post("/api/v1/drivers/search")]
async fn search(req: HttpRequest, state: web::Data<StubState>, body: web::Json<Value>) -> HttpResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    if req.headers().get("X-API-Key").and_then(|key| key.to_str().ok()) != Some(UPSTREAM_API_KEY) {
        return HttpResponse::Unauthorized()
            .json(json!({"success": false, "error": "unauthorized", "message": "Invalid API key"}));
    }

    match state.mode {
        Upstream::Broken => HttpResponse::InternalServerError()
            .json(json!({"success": false, "error": "internal_error", "message": "store unavailable"})),
        Upstream::Empty => HttpResponse::Ok()
            .json(json!({"success": true, "data": {"drivers": [], "count": 0}})),
        Upstream::Drivers => {
            let location = body["location"].clone();
            HttpResponse::Ok().json(json!({
                "success": true,
                "data": {
                    "drivers": [
                        {"driver": {"id": "near", "location": location}, "distance": 42.4242},
                        {"driver": {"id": "far", "location": location}, "distance": 99.0}
                    ],
                    "count": 2
                }
            }))
        }
    }
}

async fn stub_location_service(mode: Upstream) -> (String, web::Data<StubState>) {
    let state = web::Data::new(StubState {
        mode,
        hits: AtomicUsize::new(0),
    });
    let data = state.clone();
    let server = HttpServer::new(move || App::new().app_data(data.clone()).service(search))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind stub location service");
    let port = server.addrs()[0].port();
    actix_web::rt::spawn(server.run());
    (format!("http://127.0.0.1:{port}"), state)
}

async fn service(
    base_url: &str,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = Error> {
    let client = DriverLocationClient::new(
        base_url,
        UPSTREAM_API_KEY,
        Duration::from_secs(5),
        CircuitBreakerConfig::default(),
    )
    .expect("client");
    let data = web::Data::new(AppState::from_parts(Arc::new(client), JWT_SECRET));

    test::init_service(
        App::new()
            .app_data(data)
            .app_data(web::JsonConfig::default().error_handler(|_, _| {
                AppError::InvalidRequest("Invalid request body".to_string()).into()
            }))
            .wrap(JwtAuth)
            .wrap(RequestTimeout::default())
            .configure(api::handler),
    )
    .await
}

async fn send<S>(app: &S, request: TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = Error>,
{
    let response = test::call_service(app, request.to_request()).await;
    let status = response.status();
    let body: Value = test::read_body_json(response).await;
    (status, body)
}

fn token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token")
}

fn match_request(claims: Value, radius: f64) -> TestRequest {
    TestRequest::post()
        .uri("/api/v1/match")
        .insert_header(("Authorization", format!("Bearer {}", token(claims))))
        .set_json(json!({
            "location": {"type": "Point", "coordinates": [29.0, 41.0]},
            "radius": radius
        }))
}

fn rider() -> Value {
    json!({"user_id": "rider-1", "authenticated": true})
}

#[actix_web::test]
async fn matches_the_nearest_driver() {
    let (base_url, stub) = stub_location_service(Upstream::Drivers).await;
    let app = service(&base_url).await;

    let (status, body) = send(&app, match_request(rider(), 500.0)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body,
        json!({"driver": "near", "rider": "rider-1", "distance": 42.42})
    );
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn no_drivers_nearby_is_not_found() {
    let (base_url, _) = stub_location_service(Upstream::Empty).await;
    let app = service(&base_url).await;

    let (status, body) = send(&app, match_request(rider(), 500.0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
    assert_eq!(body["message"], json!("No drivers found nearby"));
}

#[actix_web::test]
async fn open_breaker_skips_the_upstream() {
    let (base_url, stub) = stub_location_service(Upstream::Broken).await;
    let app = service(&base_url).await;

    for _ in 0..6 {
        let (status, body) = send(&app, match_request(rider(), 500.0)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("internal_error"));
    }
    assert_eq!(stub.hits.load(Ordering::SeqCst), 6);

    let started = Instant::now();
    let (status, body) = send(&app, match_request(rider(), 500.0)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("circuit breaker is open"),
        "{body}"
    );
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 6);
}

#[actix_web::test]
async fn token_gate_rejects_before_the_upstream() {
    let (base_url, stub) = stub_location_service(Upstream::Drivers).await;
    let app = service(&base_url).await;

    let (status, body) = send(
        &app,
        TestRequest::post()
            .uri("/api/v1/match")
            .set_json(json!({"location": {"type": "Point", "coordinates": [29.0, 41.0]}, "radius": 500})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Missing Authorization header"));

    let (status, body) = send(
        &app,
        match_request(json!({"sub": "rider-1", "authenticated": false}), 500.0),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("User not authenticated"));

    let (status, body) = send(&app, match_request(json!({"authenticated": true}), 500.0)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("user_id or sub claim is required in JWT"));

    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn invalid_radius_is_a_validation_error() {
    let (base_url, stub) = stub_location_service(Upstream::Drivers).await;
    let app = service(&base_url).await;

    let (status, body) = send(&app, match_request(rider(), 0.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("validation_error"));
    assert_eq!(body["message"], json!("Request validation failed"));
    assert_eq!(
        body["details"]["errors"],
        json!([{"field": "radius", "message": "radius must be between 0.1 and 50000 meters"}])
    );
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn health_needs_no_token() {
    let (base_url, _) = stub_location_service(Upstream::Empty).await;
    let app = service(&base_url).await;

    let (status, body) = send(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "healthy", "service": "matching-service"})
    );
}
