/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Store behaviour against a live Redis on `localhost:6379`.
//!
//! Run with `cargo test -p tests -- --ignored`. Every test owns one logical
//! database and wipes the store keys in it first.

use std::sync::Arc;

use driver_location_service::{
    common::types::{Driver, DriverWithDistance},
    storage::{redis::RedisDriverStore, DriverStore, StoreError, StoreTimeouts},
};
use shared::{
    geo::GeoPoint,
    redis::types::{RedisConnectionPool, RedisSettings},
};

async fn store(partition: usize, timeouts: StoreTimeouts) -> RedisDriverStore {
    let pool = RedisConnectionPool::new(RedisSettings {
        partition,
        ..RedisSettings::default()
    })
    .await
    .expect("Failed to create Redis Connection Pool");

    let keys = pool.scan_keys("dls:*").await.expect("scan");
    pool.delete_keys(keys).await.expect("cleanup");

    RedisDriverStore::new(Arc::new(pool), timeouts)
}

fn driver(id: &str, lon: f64, lat: f64) -> Driver {
    Driver::new(id.to_string(), GeoPoint::new(lon, lat))
}

fn ids(drivers: &[DriverWithDistance]) -> Vec<&str> {
    drivers.iter().map(|found| found.driver.id.as_str()).collect()
}

#[actix_web::test]
#[ignore = "needs a live Redis on localhost:6379"]
async fn search_is_nearest_first() {
    let store = store(11, StoreTimeouts::default()).await;
    for (id, lon) in [("far", 10.003), ("near", 10.0001), ("mid", 10.001), ("out", 10.5)] {
        store.create(driver(id, lon, 10.0)).await.expect("create");
    }

    let center = GeoPoint::new(10.0, 10.0);
    let found = store.search_nearby(&center, 1000.0, 0).await.expect("search");
    assert_eq!(ids(&found), vec!["near", "mid", "far"]);
    assert!(found.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    for result in &found {
        assert_eq!(result.distance, center.distance(&result.driver.location));
    }

    let limited = store.search_nearby(&center, 1000.0, 2).await.expect("search");
    assert_eq!(ids(&limited), vec!["near", "mid"]);
}

#[actix_web::test]
#[ignore = "needs a live Redis on localhost:6379"]
async fn ties_follow_insertion_order() {
    let store = store(12, StoreTimeouts::default()).await;
    for id in ["z-first", "a-second", "m-third"] {
        store.create(driver(id, 29.0, 41.0)).await.expect("create");
    }

    let center = GeoPoint::new(29.0001, 41.0);
    let found = store.search_nearby(&center, 100.0, 0).await.expect("search");
    assert_eq!(ids(&found), vec!["z-first", "a-second", "m-third"]);

    let cut = store.search_nearby(&center, 100.0, 2).await.expect("search");
    assert_eq!(ids(&cut), vec!["z-first", "a-second"]);

    // an update keeps the original sequence
    store
        .update(driver("z-first", 29.0, 41.0))
        .await
        .expect("update");
    let found = store.search_nearby(&center, 100.0, 0).await.expect("search");
    assert_eq!(ids(&found), vec!["z-first", "a-second", "m-third"]);
}

#[actix_web::test]
#[ignore = "needs a live Redis on localhost:6379"]
async fn existence_is_checked_by_the_store() {
    let store = store(13, StoreTimeouts::default()).await;
    store.create(driver("d1", 29.0, 41.0)).await.expect("create");

    assert_eq!(
        store.create(driver("d1", 30.0, 40.0)).await,
        Err(StoreError::Conflict("d1".to_string()))
    );
    assert_eq!(
        store.get("d1").await.map(|found| found.location),
        Ok(GeoPoint::new(29.0, 41.0))
    );

    assert_eq!(
        store.update(driver("ghost", 29.0, 41.0)).await,
        Err(StoreError::NotFound("ghost".to_string()))
    );
    assert_eq!(
        store.delete("ghost").await,
        Err(StoreError::NotFound("ghost".to_string()))
    );

    store.delete("d1").await.expect("delete");
    assert_eq!(store.is_empty().await, Ok(true));
}

#[actix_web::test]
#[ignore = "needs a live Redis on localhost:6379"]
async fn failed_batch_leaves_only_prior_drivers() {
    let store = store(14, StoreTimeouts::default()).await;
    store.create(driver("taken", 29.0, 41.0)).await.expect("create");

    let result = store
        .batch_create(vec![
            driver("b1", 29.0, 41.0),
            driver("", 29.0, 41.0),
            driver("taken", 30.0, 40.0),
        ])
        .await;
    assert!(matches!(result, Err(StoreError::Batch(_))));

    assert_eq!(
        store.get("b1").await,
        Err(StoreError::NotFound("b1".to_string()))
    );
    assert_eq!(
        store.get("taken").await.map(|found| found.location),
        Ok(GeoPoint::new(29.0, 41.0))
    );
    let found = store
        .search_nearby(&GeoPoint::new(29.0, 41.0), 10.0, 0)
        .await
        .expect("search");
    assert_eq!(ids(&found), vec!["taken"]);
}

#[actix_web::test]
#[ignore = "needs a live Redis on localhost:6379"]
async fn expired_batch_budget_rolls_back() {
    let store = store(
        15,
        StoreTimeouts {
            batch: 1,
            ..StoreTimeouts::default()
        },
    )
    .await;

    let drivers = (0..300)
        .map(|i| driver(&format!("t{i}"), 29.0 + f64::from(i) * 1e-4, 41.0))
        .collect();
    let result = store.batch_create(drivers).await;

    assert!(
        matches!(result, Err(StoreError::Batch(ref message)) if message.contains("timed out")),
        "{result:?}"
    );
    assert_eq!(store.is_empty().await, Ok(true));
    assert_eq!(
        store.get("t0").await,
        Err(StoreError::NotFound("t0".to_string()))
    );
}
