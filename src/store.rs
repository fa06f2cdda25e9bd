//! Forensic store
//!
//! Append-only sink for attack events and gateway request logs. Writes are
//! always fire-and-forget from the request path: `spawn_append` and
//! `spawn_record_request` detach the write and only log its outcome.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::{AttackEvent, RequestLog};

#[axum::async_trait]
pub trait ForensicStore: Send + Sync {
    async fn append(&self, event: &AttackEvent) -> Result<(), StoreError>;

    async fn record_request(&self, log: &RequestLog) -> Result<(), StoreError>;

    /// Release connections on shutdown
    async fn close(&self) {}
}

/// Persist an attack event without blocking the caller
pub fn spawn_append(store: Arc<dyn ForensicStore>, event: AttackEvent) {
    tokio::spawn(async move {
        match store.append(&event).await {
            Ok(()) => tracing::info!(
                severity = %event.severity,
                session = %event.session_id,
                attack_type = %event.attack_type,
                ip = %event.ip_address,
                "Attack logged"
            ),
            Err(e) => tracing::warn!(
                session = %event.session_id,
                error = %e,
                "Failed to persist attack event"
            ),
        }
    });
}

/// Persist a gateway request log without blocking the caller
pub fn spawn_record_request(store: Arc<dyn ForensicStore>, log: RequestLog) {
    tokio::spawn(async move {
        if let Err(e) = store.record_request(&log).await {
            tracing::warn!(url = %log.url, error = %e, "Failed to persist request log");
        }
    });
}

// ============================================================================
// POSTGRES
// ============================================================================

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl ForensicStore for PgStore {
    async fn append(&self, event: &AttackEvent) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        event.insert(&self.pool).await?;
        Ok(())
    }

    async fn record_request(&self, log: &RequestLog) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        log.insert(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Forensic store connection pool closed");
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Records kept per table when no capacity is configured
pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Keeps recent records in process; used when no database is configured.
/// Each table is a ring that evicts its oldest record once full.
pub struct MemoryStore {
    capacity: usize,
    events: Mutex<VecDeque<AttackEvent>>,
    requests: Mutex<VecDeque<RequestLog>>,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
            requests: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn events(&self) -> Vec<AttackEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn requests(&self) -> Vec<RequestLog> {
        self.requests.lock().iter().cloned().collect()
    }

    fn push_bounded<T>(&self, ring: &Mutex<VecDeque<T>>, record: T) {
        let mut ring = ring.lock();
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(record);
    }
}

#[axum::async_trait]
impl ForensicStore for MemoryStore {
    async fn append(&self, event: &AttackEvent) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.push_bounded(&self.events, event.clone());
        Ok(())
    }

    async fn record_request(&self, log: &RequestLog) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.push_bounded(&self.requests, log.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let count = self.events.lock().len();
        tracing::info!("In-memory forensic store closed with {} attack events", count);
    }
}
