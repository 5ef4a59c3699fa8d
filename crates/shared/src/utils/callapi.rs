/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::call_external_api;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::{error, info};

#[macros::add_error]
pub enum CallAPIError {
    InvalidRequest(String),
    SerializationError(String),
    DeserializationError(String),
    /// Non 2xx status with the raw response body.
    UnexpectedStatus(u16, String),
    TransportError(String),
    RequestTimeout(String),
}

impl CallAPIError {
    pub fn message(&self) -> String {
        match self {
            CallAPIError::InvalidRequest(err) => err.to_string(),
            CallAPIError::SerializationError(err) => err.to_string(),
            CallAPIError::DeserializationError(err) => err.to_string(),
            CallAPIError::UnexpectedStatus(status, body) => {
                format!("unexpected status: {status}, body: {body}")
            }
            CallAPIError::TransportError(err) => err.to_string(),
            CallAPIError::RequestTimeout(err) => format!("request timed out : {err}"),
        }
    }
}

/// Sends a JSON request and decodes a JSON response.
///
/// The `client` carries the transport level settings (timeouts, pooling) so
/// callers keep one per upstream. Every call is logged with the
/// `[OUTGOING API]` tag and observed in `external_request_duration`.
///
/// # Returns
///
/// * `Ok(T)` when the upstream answers with a 2xx and a body decodable into `T`.
/// * `Err(CallAPIError::UnexpectedStatus)` for any other status.
/// * `Err(CallAPIError::TransportError | RequestTimeout)` when no response was received.
pub async fn call_api<T, U>(
    client: &Client,
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<U>,
) -> Result<T, CallAPIError>
where
    T: DeserializeOwned,
    U: Serialize + Debug,
{
    let start_time = std::time::Instant::now();

    let mut header_map = HeaderMap::new();
    header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (header_key, header_value) in headers {
        let header_name = HeaderName::from_str(header_key).map_err(|_| {
            CallAPIError::InvalidRequest(format!("Invalid Header Name : {header_key}"))
        })?;
        let header_value = HeaderValue::from_str(header_value).map_err(|_| {
            CallAPIError::InvalidRequest(format!("Invalid Header Value : {header_key}"))
        })?;

        header_map.insert(header_name, header_value);
    }

    let mut request = client
        .request(method.to_owned(), url.to_owned())
        .headers(header_map);

    if let Some(body) = &body {
        let body = serde_json::to_string(body)
            .map_err(|err| CallAPIError::SerializationError(err.to_string()))?;
        request = request.body(body);
    }

    let resp = request.send().await;

    let url_str = format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or(""),
        url.port_or_known_default().unwrap_or(80)
    );

    let status = match resp.as_ref() {
        Ok(resp) => resp.status().as_str().to_string(),
        Err(err) => err
            .status()
            .map(|status| status.as_str().to_string())
            .unwrap_or("UNKNOWN".to_string()),
    };

    call_external_api!(
        method.as_str(),
        url_str.as_str(),
        url.path(),
        status.as_str(),
        start_time
    );

    match resp {
        Ok(resp) if resp.status().is_success() => {
            info!(tag = "[OUTGOING API]", request_method = %method, request_url = %url_str, request_path = url.path(), response_status = status, latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            resp.json::<T>()
                .await
                .map_err(|err| CallAPIError::DeserializationError(err.to_string()))
        }
        Ok(resp) => {
            let status_code = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_url = %url_str, request_path = url.path(), response_status = status, response_body = body, latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            Err(CallAPIError::UnexpectedStatus(status_code, body))
        }
        Err(err) => {
            error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_url = %url_str, request_path = url.path(), error = %err, latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            if err.is_timeout() {
                Err(CallAPIError::RequestTimeout(err.to_string()))
            } else {
                Err(CallAPIError::TransportError(err.to_string()))
            }
        }
    }
}
