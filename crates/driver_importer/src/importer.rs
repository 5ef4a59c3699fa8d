/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Bulk loads driver positions from a `latitude,longitude` CSV file into the
//! driver location service, a batch per request, with a fixed pool of
//! concurrent workers.

use std::{io::Read, path::PathBuf, sync::Arc};

use csv::{ReaderBuilder, StringRecord, Trim};
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use shared::{geo::GeoPoint, utils::callapi::call_api};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const BATCH_PATH: &str = "/api/v1/drivers/batch";

#[macros::add_error]
pub enum ImportError {
    FileUnreadable(String),
    InvalidBaseUrl(String),
    ClientSetup(String),
    InvalidRecord(String),
}

impl ImportError {
    pub fn message(&self) -> String {
        match self {
            ImportError::FileUnreadable(err) => format!("failed to open CSV file: {err}"),
            ImportError::InvalidBaseUrl(err) => format!("invalid base url: {err}"),
            ImportError::ClientSetup(err) => format!("failed to build http client: {err}"),
            ImportError::InvalidRecord(err) => err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub file: PathBuf,
    pub base_url: String,
    pub api_key: String,
    pub batch_size: usize,
    pub workers: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CreateDriverRequest {
    pub location: GeoPoint,
}

#[derive(Serialize, Debug)]
struct BatchCreateRequest<'a> {
    drivers: &'a [CreateDriverRequest],
}

#[derive(Deserialize, Debug)]
struct BatchCreateResponse {
    success: bool,
    #[serde(default)]
    data: Option<BatchCreateData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BatchCreateData {
    count: usize,
}

/// `success + error == requested` once an import has finished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub requested: usize,
    pub success: usize,
    pub error: usize,
}

impl std::ops::AddAssign for ImportSummary {
    fn add_assign(&mut self, other: Self) {
        self.requested += other.requested;
        self.success += other.success;
        self.error += other.error;
    }
}

/// Reads a `latitude,longitude` row into a create request.
pub fn parse_record(record: &StringRecord) -> Result<CreateDriverRequest, ImportError> {
    let (latitude, longitude) = match (record.get(0), record.get(1)) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        _ => {
            return Err(ImportError::InvalidRecord(format!(
                "invalid record format: expected at least 2 fields (latitude,longitude), got {}",
                record.len()
            )))
        }
    };

    let latitude = latitude.parse::<f64>().map_err(|err| {
        ImportError::InvalidRecord(format!("invalid latitude '{latitude}': {err}"))
    })?;
    let longitude = longitude.parse::<f64>().map_err(|err| {
        ImportError::InvalidRecord(format!("invalid longitude '{longitude}': {err}"))
    })?;

    Ok(CreateDriverRequest {
        location: GeoPoint::new(longitude, latitude),
    })
}

struct BatchSender {
    client: Client,
    url: Url,
    api_key: String,
}

impl BatchSender {
    async fn send(&self, worker_id: usize, batch: &[CreateDriverRequest]) -> ImportSummary {
        let mut summary = ImportSummary {
            requested: batch.len(),
            ..ImportSummary::default()
        };

        let response: Result<BatchCreateResponse, _> = call_api(
            &self.client,
            Method::POST,
            &self.url,
            vec![(API_KEY_HEADER, self.api_key.as_str())],
            Some(BatchCreateRequest { drivers: batch }),
        )
        .await;

        let created = match response {
            Ok(BatchCreateResponse {
                success: true,
                data: Some(data),
                ..
            }) => data.count.min(batch.len()),
            Ok(response) => {
                warn!(tag = "[Import Batch]", worker_id, error = response.error.unwrap_or_default(), message = response.message.unwrap_or_default());
                0
            }
            Err(err) => {
                warn!(tag = "[Import Batch]", worker_id, error = %err.message());
                0
            }
        };

        if created != batch.len() {
            warn!(tag = "[Import Batch]", worker_id, requested = batch.len(), created, "Batch discrepancy");
        }
        info!(tag = "[Import Batch]", worker_id, requested = batch.len(), created);

        summary.success = created;
        summary.error = batch.len() - created;
        summary
    }
}

pub async fn run_import(settings: ImportSettings) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(&settings.file).map_err(|err| {
        ImportError::FileUnreadable(format!("{} : {err}", settings.file.display()))
    })?;
    import_from_reader(file, &settings).await
}

/// Streams rows from `reader` to the workers, the first row is a header.
pub async fn import_from_reader<R: Read>(
    reader: R,
    settings: &ImportSettings,
) -> Result<ImportSummary, ImportError> {
    let url = Url::parse(&format!("{}{BATCH_PATH}", settings.base_url.trim_end_matches('/')))
        .map_err(|err| ImportError::InvalidBaseUrl(format!("{} : {err}", settings.base_url)))?;
    let client = Client::builder()
        .build()
        .map_err(|err| ImportError::ClientSetup(err.to_string()))?;
    let sender = Arc::new(BatchSender {
        client,
        url,
        api_key: settings.api_key.to_owned(),
    });

    let batch_size = settings.batch_size.max(1);
    let workers = settings.workers.max(1);

    let (batch_tx, batch_rx) = mpsc::channel::<Vec<CreateDriverRequest>>(workers * 2);
    let batch_rx = Arc::new(Mutex::new(batch_rx));

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            let sender = sender.clone();
            let batch_rx = batch_rx.clone();
            tokio::spawn(async move {
                let mut summary = ImportSummary::default();
                loop {
                    let batch = batch_rx.lock().await.recv().await;
                    match batch {
                        Some(batch) => summary += sender.send(worker_id, &batch).await,
                        None => break,
                    }
                }
                summary
            })
        })
        .collect();

    let mut summary = ImportSummary::default();
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut batch = Vec::with_capacity(batch_size);
    for (index, record) in csv_reader.records().enumerate() {
        // header is line 1
        let line = index + 2;
        match record
            .map_err(|err| ImportError::InvalidRecord(err.to_string()))
            .and_then(|record| parse_record(&record))
        {
            Ok(request) => batch.push(request),
            Err(err) => {
                warn!(tag = "[Import Record]", line, error = %err.message());
                summary.requested += 1;
                summary.error += 1;
                continue;
            }
        }

        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if batch_tx.send(full).await.is_err() {
                break;
            }
        }
    }
    if !batch.is_empty() {
        let _ = batch_tx.send(batch).await;
    }
    drop(batch_tx);

    for handle in handles {
        match handle.await {
            Ok(worker_summary) => summary += worker_summary,
            Err(err) => warn!(tag = "[Import Worker]", error = %err),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::{post, web, App, HttpRequest, HttpResponse, HttpServer};
    use serde_json::{json, Value};

    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn parses_latitude_then_longitude() {
        let request = parse_record(&record(&["41.0082", "28.9784"])).expect("record");
        assert_eq!(request.location, GeoPoint::new(28.9784, 41.0082));
    }

    #[test]
    fn rejects_short_and_non_numeric_rows() {
        let err = parse_record(&record(&["41.0"])).expect_err("short");
        assert!(err.message().contains("expected at least 2 fields"));

        let err = parse_record(&record(&["north", "28.9"])).expect_err("latitude");
        assert!(err.message().starts_with("invalid latitude 'north'"));

        let err = parse_record(&record(&["41.0", "east"])).expect_err("longitude");
        assert!(err.message().starts_with("invalid longitude 'east'"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = run_import(ImportSettings {
            file: PathBuf::from("does-not-exist.csv"),
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "secret".to_string(),
            batch_size: 10,
            workers: 1,
        })
        .await
        .expect_err("missing");
        assert!(matches!(err, ImportError::FileUnreadable(_)));
    }

    struct Received(AtomicUsize);

    /// Accepts batches, fails any batch holding a driver west of the meridian.
    #[post("/api/v1/drivers/batch")]
    async fn batch(req: HttpRequest, received: web::Data<Received>, body: web::Json<Value>) -> HttpResponse {
        if req.headers().get(API_KEY_HEADER).and_then(|key| key.to_str().ok()) != Some("secret") {
            return HttpResponse::Unauthorized()
                .json(json!({"success": false, "error": "unauthorized", "message": "Invalid API key"}));
        }

        let drivers = body["drivers"].as_array().cloned().unwrap_or_default();
        received.0.fetch_add(drivers.len(), Ordering::SeqCst);

        let rejected = drivers
            .iter()
            .any(|driver| driver["location"]["coordinates"][0].as_f64().unwrap_or(0.0) < 0.0);
        if rejected {
            return HttpResponse::InternalServerError()
                .json(json!({"success": false, "error": "internal_error", "message": "boom"}));
        }

        let count = drivers.len();
        HttpResponse::Created().json(json!({
            "success": true,
            "data": {"drivers": drivers, "count": count}
        }))
    }

    async fn stub_service() -> (String, web::Data<Received>) {
        let received = web::Data::new(Received(AtomicUsize::new(0)));
        let data = received.clone();
        let server = HttpServer::new(move || App::new().app_data(data.clone()).service(batch))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .expect("bind");
        let port = server.addrs()[0].port();
        actix_web::rt::spawn(server.run());
        (format!("http://127.0.0.1:{port}"), received)
    }

    fn settings(base_url: &str, api_key: &str) -> ImportSettings {
        ImportSettings {
            file: PathBuf::from("Coordinates.csv"),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            batch_size: 2,
            workers: 2,
        }
    }

    #[actix_web::test]
    async fn counts_created_and_failed_rows() {
        let (base_url, received) = stub_service().await;
        let csv = "latitude,longitude\n41.0,29.0\n41.1,29.1\nbad,row\n41.2,29.2\n";

        let summary = import_from_reader(csv.as_bytes(), &settings(&base_url, "secret"))
            .await
            .expect("import");

        assert_eq!(
            summary,
            ImportSummary {
                requested: 4,
                success: 3,
                error: 1
            }
        );
        assert_eq!(received.0.load(Ordering::SeqCst), 3);
    }

    #[actix_web::test]
    async fn failed_batches_count_as_errors() {
        let (base_url, _) = stub_service().await;
        let csv = "latitude,longitude\n41.0,-29.0\n41.1,29.1\n41.2,29.2\n";

        let summary = import_from_reader(csv.as_bytes(), &settings(&base_url, "secret"))
            .await
            .expect("import");
        assert_eq!(summary.requested, 3);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.error, 2);

        let summary = import_from_reader(csv.as_bytes(), &settings(&base_url, "wrong"))
            .await
            .expect("import");
        assert_eq!(summary.success, 0);
        assert_eq!(summary.error, 3);
    }
}
