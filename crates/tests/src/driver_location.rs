/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test::{self, TestRequest},
    web, App, Error,
};
use driver_location_service::{
    cache::memory::InMemoryDriverCache,
    domain::api,
    environment::{AppState, SearchSettings},
    middleware::{ApiKeyAuth, CheckContentLength, RequestTimeout, API_KEY_HEADER},
    storage::memory::InMemoryDriverStore,
    tools::error::AppError,
};
use serde_json::{json, Value};
use shared::geo::GeoPoint;

const API_KEY: &str = "test-api-key";

struct Harness {
    store: Arc<InMemoryDriverStore>,
    cache: Arc<InMemoryDriverCache>,
    data: web::Data<AppState>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryDriverStore::new());
    let cache = Arc::new(InMemoryDriverCache::new());
    let data = web::Data::new(AppState::from_parts(
        store.clone(),
        cache.clone(),
        API_KEY,
        SearchSettings::default(),
    ));
    Harness { store, cache, data }
}

async fn service(
    data: web::Data<AppState>,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = Error> {
    test::init_service(
        App::new()
            .app_data(data)
            .app_data(web::JsonConfig::default().error_handler(|_, _| {
                AppError::InvalidRequest("Invalid request body".to_string()).into()
            }))
            .wrap(ApiKeyAuth)
            .wrap(CheckContentLength::default())
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

fn authorized(request: TestRequest) -> TestRequest {
    request.insert_header((API_KEY_HEADER, API_KEY))
}

fn point(longitude: f64, latitude: f64) -> Value {
    json!({"type": "Point", "coordinates": [longitude, latitude]})
}

async fn create<S>(app: &S, id: &str, longitude: f64, latitude: f64) -> Value
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = Error>,
{
    let (status, body) = send(
        app,
        authorized(TestRequest::post().uri("/api/v1/drivers"))
            .set_json(json!({"id": id, "location": point(longitude, latitude)})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn ids(body: &Value) -> Vec<String> {
    body["data"]["drivers"]
        .as_array()
        .map(|drivers| {
            drivers
                .iter()
                .filter_map(|entry| entry["driver"]["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[actix_web::test]
async fn create_then_get_returns_the_driver() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    let body = create(&app, "d1", 29.0, 41.0).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Driver created successfully"));
    assert_eq!(body["data"]["id"], json!("d1"));

    let (status, body) = send(&app, authorized(TestRequest::get().uri("/api/v1/drivers/d1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["location"]["coordinates"], json!([29.0, 41.0]));
}

#[actix_web::test]
async fn search_orders_by_distance_within_radius() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    create(&app, "s1", 10.0, 10.0).await;
    create(&app, "s2", 10.001, 10.001).await;
    create(&app, "s3", 20.0, 20.0).await;

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers/search"))
            .set_json(json!({"location": point(10.0, 10.0), "radius": 200, "limit": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["s1", "s2"]);
    assert_eq!(body["data"]["count"], json!(2));

    let distances: Vec<f64> = body["data"]["drivers"]
        .as_array()
        .map(|drivers| drivers.iter().filter_map(|entry| entry["distance"].as_f64()).collect())
        .unwrap_or_default();
    assert!(distances[0] < distances[1], "{distances:?}");
}

#[actix_web::test]
async fn missing_api_key_never_reaches_the_store() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    let (status, body) = send(
        &app,
        TestRequest::post()
            .uri("/api/v1/drivers/search")
            .set_json(json!({"location": point(10.0, 10.0), "radius": 200})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("API key is required"));

    let (status, body) = send(
        &app,
        TestRequest::post()
            .uri("/api/v1/drivers")
            .insert_header((API_KEY_HEADER, "wrong"))
            .set_json(json!({"id": "d1", "location": point(29.0, 41.0)})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Invalid API key"));

    assert_eq!(harness.store.calls(), 0);
    assert_eq!(harness.store.len().await, 0);
}

#[actix_web::test]
async fn health_is_public_and_reports_the_cache() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    let (status, body) = send(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "healthy", "service": "driver-location-service", "cache": "healthy"})
    );

    harness.cache.set_failing(true);
    let (_, body) = send(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(body["cache"], json!("unavailable"));
}

#[actix_web::test]
async fn reads_see_every_write() {
    let harness = harness();
    let app = service(harness.data.clone()).await;
    create(&app, "d1", 29.0, 41.0).await;

    // warm the per-driver cache
    send(&app, authorized(TestRequest::get().uri("/api/v1/drivers/d1"))).await;
    assert!(harness.cache.hits() >= 1);

    let (status, body) = send(
        &app,
        authorized(TestRequest::patch().uri("/api/v1/drivers/d1/location")).set_json(point(30.0, 40.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Driver location updated successfully"));

    let (_, body) = send(&app, authorized(TestRequest::get().uri("/api/v1/drivers/d1"))).await;
    assert_eq!(body["data"]["location"]["coordinates"], json!([30.0, 40.0]));

    let (status, body) = send(
        &app,
        authorized(TestRequest::put().uri("/api/v1/drivers/d1"))
            .set_json(json!({"location": point(31.0, 39.0)})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, body) = send(&app, authorized(TestRequest::get().uri("/api/v1/drivers/d1"))).await;
    assert_eq!(body["data"]["location"]["coordinates"], json!([31.0, 39.0]));

    let (status, body) = send(&app, authorized(TestRequest::delete().uri("/api/v1/drivers/d1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Driver deleted successfully"));

    let (status, body) = send(&app, authorized(TestRequest::get().uri("/api/v1/drivers/d1"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
}

#[actix_web::test]
async fn mutations_drop_cached_searches() {
    let harness = harness();
    let app = service(harness.data.clone()).await;
    create(&app, "s1", 10.0, 10.0).await;

    let search = || {
        authorized(TestRequest::post().uri("/api/v1/drivers/search"))
            .set_json(json!({"location": point(10.0, 10.0), "radius": 500}))
    };

    let (_, body) = send(&app, search()).await;
    assert_eq!(ids(&body), vec!["s1"]);
    assert_eq!(harness.cache.nearby_entries(), 1);

    create(&app, "s2", 10.001, 10.0).await;
    assert_eq!(harness.cache.nearby_entries(), 0);

    let (_, body) = send(&app, search()).await;
    assert_eq!(ids(&body), vec!["s1", "s2"]);

    send(&app, authorized(TestRequest::delete().uri("/api/v1/drivers/s1"))).await;
    assert_eq!(harness.cache.nearby_entries(), 0);

    let (_, body) = send(&app, search()).await;
    assert_eq!(ids(&body), vec!["s2"]);
}

#[actix_web::test]
async fn failing_cache_does_not_fail_requests() {
    let harness = harness();
    harness.cache.set_failing(true);
    let app = service(harness.data.clone()).await;

    create(&app, "d1", 29.0, 41.0).await;
    let (status, body) = send(&app, authorized(TestRequest::get().uri("/api/v1/drivers/d1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!("d1"));

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers/search"))
            .set_json(json!({"location": point(29.0, 41.0), "radius": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["d1"]);
}

#[actix_web::test]
async fn batch_create_is_all_or_nothing() {
    let harness = harness();
    let app = service(harness.data.clone()).await;
    create(&app, "taken", 29.0, 41.0).await;

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers/batch")).set_json(json!({
            "drivers": [
                {"id": "b1", "location": point(29.0, 41.0)},
                {"id": "taken", "location": point(29.0, 41.0)}
            ]
        })),
    )
    .await;
    assert!(status.is_client_error() || status.is_server_error(), "{status}");
    assert_eq!(body["success"], json!(false));
    assert_eq!(harness.store.len().await, 1);

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers")).set_json(json!([
            {"location": point(29.0, 41.0)},
            {"location": point(29.1, 41.1)}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], json!("Drivers created successfully"));
    assert_eq!(body["data"]["count"], json!(2));
    assert_eq!(harness.store.len().await, 3);
}

#[actix_web::test]
async fn empty_batch_changes_nothing() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    let (status, _) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers/batch")).set_json(json!({"drivers": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.store.len().await, 0);
}

#[actix_web::test]
async fn malformed_requests_are_rejected() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers"))
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Invalid request body"));

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers"))
            .set_json(json!({"id": "d1", "location": point(200.0, 41.0)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_request"));

    let (status, _) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers/search"))
            .set_json(json!({"location": point(10.0, 10.0), "limit": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.store.len().await, 0);
}

#[actix_web::test]
async fn oversized_bodies_are_rejected_before_the_handler() {
    let harness = harness();
    let app = service(harness.data.clone()).await;

    let (status, body) = send(
        &app,
        authorized(TestRequest::post().uri("/api/v1/drivers"))
            .insert_header(("content-type", "application/json"))
            .set_payload(vec![b' '; 600_000]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("payload_too_large"));
    assert_eq!(harness.store.len().await, 0);
}

#[test]
fn istanbul_to_ankara_distance() {
    let istanbul = GeoPoint::new(28.9784, 41.0082);
    let ankara = GeoPoint::new(32.8597, 39.9334);
    let distance = istanbul.distance(&ankara);
    assert!((336000.0..=366000.0).contains(&distance), "{distance}");
}
