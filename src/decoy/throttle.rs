//! Deception throttle
//!
//! Simulated backend latency for every decoy route and a fixed-window login
//! limiter. Neither protects anything; both exist so the decoy behaves like a
//! hardened production API.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;

use crate::middleware::inbound::RequestStart;

// ============================================================================
// FAKE LATENCY
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeLatency {
    range_ms: RangeInclusive<u64>,
}

impl FakeLatency {
    pub fn new(range_ms: RangeInclusive<u64>) -> Self {
        Self { range_ms }
    }

    pub fn sample(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.range_ms.clone());
        Duration::from_millis(ms)
    }
}

/// Stamp the request start, then stall for a random interval before the
/// handler runs. The sleep yields, so other requests proceed meanwhile.
pub async fn fake_delay(State(latency): State<FakeLatency>, mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(RequestStart(Instant::now()));
    let delay = latency.sample();
    tokio::time::sleep(delay).await;
    next.run(req).await
}

// ============================================================================
// FAKE LOGIN LIMITER
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub count: u32,
    pub started: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl RateDecision {
    /// Standard `RateLimit-*` headers
    pub fn apply(&self, headers: &mut HeaderMap) {
        let reset_secs = self.reset_after.as_secs() + u64::from(self.reset_after.subsec_nanos() > 0);
        headers.insert("ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert("ratelimit-reset", HeaderValue::from(reset_secs));
    }
}

pub struct LoginThrottle {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl LoginThrottle {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one attempt for `key` and decide. Every attempt counts, including
    /// those already over the limit.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock();
        let entry = windows
            .entry(key.to_string())
            .or_insert(RateWindow { count: 0, started: now });

        let mut elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.count = 0;
            entry.started = now;
            elapsed = Duration::ZERO;
        }
        entry.count = entry.count.saturating_add(1);

        RateDecision {
            allowed: entry.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_after: self.window - elapsed,
        }
    }

    /// Drop windows that have fully elapsed
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before - windows.len()
    }

    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.sweep_at(Instant::now());
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = self.tracked(), "Swept login rate windows");
                }
            }
        })
    }
}
