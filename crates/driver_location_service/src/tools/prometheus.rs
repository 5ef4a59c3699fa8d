/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::PrometheusMetrics;
use prometheus::{register_int_counter_vec, IntCounterVec};
use shared::utils::prometheus::init_prometheus_metrics;

pub static DRIVER_CACHE_HITS: once_cell::sync::Lazy<IntCounterVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter_vec!("driver_cache_hits", "Driver cache hits", &["kind"])
            .expect("Failed to register driver cache hits metrics")
    });

pub static DRIVER_CACHE_MISSES: once_cell::sync::Lazy<IntCounterVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter_vec!("driver_cache_misses", "Driver cache misses", &["kind"])
            .expect("Failed to register driver cache misses metrics")
    });

/// Records a cache lookup outcome, `$kind` is either `driver` or `nearby`.
#[macro_export]
macro_rules! cache_lookup {
    ($kind:expr, $hit:expr) => {
        if $hit {
            $crate::tools::prometheus::DRIVER_CACHE_HITS
                .with_label_values(&[$kind])
                .inc();
        } else {
            $crate::tools::prometheus::DRIVER_CACHE_MISSES
                .with_label_values(&[$kind])
                .inc();
        }
    };
}

/// Shared request histograms plus the driver cache counters, served on `/metrics`.
pub fn prometheus_metrics() -> PrometheusMetrics {
    let prometheus = init_prometheus_metrics();

    prometheus
        .registry
        .register(Box::new(DRIVER_CACHE_HITS.to_owned()))
        .expect("Failed to register driver cache hits metrics");

    prometheus
        .registry
        .register(Box::new(DRIVER_CACHE_MISSES.to_owned()))
        .expect("Failed to register driver cache misses metrics");

    prometheus
}
