/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
//! Circuit breaker guarding calls to an upstream service.
//!
//! # State Machine
//!
//! ```text
//! Closed   --[consecutive failures > failure_threshold]--> Open
//! Closed   --[interval elapsed]--> Closed (counts cleared)
//! Open     --[timeout elapsed]--> HalfOpen
//! HalfOpen --[max_requests consecutive successes]--> Closed
//! HalfOpen --[any failure]--> Open
//! ```
//!
//! While Open every call is rejected without running the operation. While
//! HalfOpen at most `max_requests` probes are let through, the rest are
//! rejected until the probes settle the state.
//!
//! Every state change starts a new generation. Outcomes of calls admitted in
//! an older generation are ignored, so a slow request cannot close or trip a
//! breaker that has already moved on.

use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{info, warn};

use crate::tools::prometheus::CIRCUIT_BREAKER_STATE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Probes allowed while half-open, also the successes needed to close.
    pub max_requests: u32,
    /// Closed state observation window, counts are cleared when it elapses.
    pub interval: Duration,
    /// Time spent open before probing.
    pub timeout: Duration,
    /// Consecutive failures tolerated before tripping.
    pub failure_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
            failure_threshold: 5,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    /// Value exported on the `circuit_breaker_state` gauge.
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BreakerError<E> {
    /// The call was not attempted.
    Rejected(CircuitState),
    /// The call ran and failed.
    Failed(E),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests += 1;
    }

    fn on_success(&mut self) {
        self.total_successes += 1;
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
    }
}

#[derive(Debug)]
struct CircuitBreakerInner {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    /// End of the current interval (closed) or of the open period.
    expiry: Option<Instant>,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitBreakerInner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("inner", &self.inner)
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: &str, config: CircuitBreakerConfig) -> Self {
        let now = Instant::now();
        let breaker = Self {
            name: name.to_string(),
            inner: Mutex::new(CircuitBreakerInner {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry: Self::closed_expiry(&config, now),
            }),
            config,
        };
        breaker.export(CircuitState::Closed);
        breaker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.state_at(Instant::now())
    }

    pub fn counts(&self) -> Counts {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.counts
    }

    /// Runs `operation` unless the breaker rejects it, and records its outcome.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self
            .before_request(Instant::now())
            .map_err(BreakerError::Rejected)?;

        let result = operation().await;

        self.after_request(generation, result.is_ok(), Instant::now());
        result.map_err(BreakerError::Failed)
    }

    fn lock(&self) -> MutexGuard<'_, CircuitBreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn closed_expiry(config: &CircuitBreakerConfig, now: Instant) -> Option<Instant> {
        (!config.interval.is_zero()).then(|| now + config.interval)
    }

    fn export(&self, state: CircuitState) {
        CIRCUIT_BREAKER_STATE
            .with_label_values(&[self.name.as_str()])
            .set(state.as_gauge());
    }

    fn state_at(&self, now: Instant) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        inner.state
    }

    /// Applies the transitions that only depend on time.
    fn refresh(&self, inner: &mut CircuitBreakerInner, now: Instant) {
        match (inner.state, inner.expiry) {
            (CircuitState::Closed, Some(expiry)) if expiry <= now => {
                inner.generation += 1;
                inner.counts = Counts::default();
                inner.expiry = Self::closed_expiry(&self.config, now);
            }
            (CircuitState::Open, Some(expiry)) if expiry <= now => {
                self.set_state(inner, CircuitState::HalfOpen, now);
            }
            _ => {}
        }
    }

    fn set_state(&self, inner: &mut CircuitBreakerInner, state: CircuitState, now: Instant) {
        if inner.state == state {
            return;
        }
        let previous = inner.state;

        inner.state = state;
        inner.generation += 1;
        inner.counts = Counts::default();
        inner.expiry = match state {
            CircuitState::Closed => Self::closed_expiry(&self.config, now),
            CircuitState::Open => Some(now + self.config.timeout),
            CircuitState::HalfOpen => None,
        };

        match state {
            CircuitState::Open => {
                warn!(tag = "[Circuit Breaker]", name = %self.name, from = %previous, to = %state)
            }
            _ => info!(tag = "[Circuit Breaker]", name = %self.name, from = %previous, to = %state),
        }
        self.export(state);
    }

    fn before_request(&self, now: Instant) -> Result<u64, CircuitState> {
        let mut inner = self.lock();
        self.refresh(&mut inner, now);

        match inner.state {
            CircuitState::Open => return Err(CircuitState::Open),
            CircuitState::HalfOpen if inner.counts.requests >= self.config.max_requests => {
                return Err(CircuitState::HalfOpen)
            }
            _ => {}
        }

        inner.counts.on_request();
        Ok(inner.generation)
    }

    fn after_request(&self, generation: u64, success: bool, now: Instant) {
        let mut inner = self.lock();
        self.refresh(&mut inner, now);

        if inner.generation != generation {
            return;
        }

        match (inner.state, success) {
            (CircuitState::Closed, true) => inner.counts.on_success(),
            (CircuitState::HalfOpen, true) => {
                inner.counts.on_success();
                if inner.counts.consecutive_successes >= self.config.max_requests {
                    self.set_state(&mut inner, CircuitState::Closed, now);
                }
            }
            (CircuitState::Closed, false) => {
                inner.counts.on_failure();
                if inner.counts.consecutive_failures > self.config.failure_threshold {
                    self.set_state(&mut inner, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, false) => {
                self.set_state(&mut inner, CircuitState::Open, now);
            }
            (CircuitState::Open, _) => {}
        }
    }
}
