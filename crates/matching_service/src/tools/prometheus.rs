/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::PrometheusMetrics;
use prometheus::{register_int_gauge_vec, IntGaugeVec};
use shared::utils::prometheus::init_prometheus_metrics;

/// 0 closed, 1 half-open, 2 open.
pub static CIRCUIT_BREAKER_STATE: once_cell::sync::Lazy<IntGaugeVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_gauge_vec!(
            "circuit_breaker_state",
            "Circuit breaker state per upstream",
            &["name"]
        )
        .expect("Failed to register circuit breaker state metrics")
    });

pub fn prometheus_metrics() -> PrometheusMetrics {
    let prometheus = init_prometheus_metrics();

    prometheus
        .registry
        .register(Box::new(CIRCUIT_BREAKER_STATE.to_owned()))
        .expect("Failed to register circuit breaker state metrics");

    prometheus
}
