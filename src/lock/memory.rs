use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::config::LockConfig;
use super::errors::LockError;
use super::lock_id::{LockId, LockInfo, LockSubject};
use super::manager::{add_duration, LockManager};
use crate::common::{Clock, SystemClock};
use crate::metrics::Metrics;

// ============================================================================
// In-Memory Lock Manager
// ============================================================================
//
// A single mutex guards both indexes, so every operation is atomic with
// respect to every other. Nothing awaits while the table is held.
//
// Records:
// - by_subject points at the most recently issued LockId for a subject
// - records holds every unreleased lock, including expired ones still inside
//   the retention window
// - expired keeps only the expiration of unreleased locks purged after the
//   retention window, so their ids keep answering Expired until released
//
// ============================================================================

#[derive(Default)]
struct LockTable {
    by_subject: HashMap<LockSubject, LockId>,
    records: HashMap<LockId, LockInfo>,
    expired: HashMap<LockId, DateTime<Utc>>,
}

impl LockTable {
    fn holder(&self, subject: &LockSubject) -> Option<&LockInfo> {
        self.by_subject
            .get(subject)
            .and_then(|lock_id| self.records.get(lock_id))
    }

    fn remove(&mut self, lock_id: &LockId) -> Option<LockInfo> {
        let info = self.records.remove(lock_id)?;
        if self.by_subject.get(&info.subject) == Some(lock_id) {
            self.by_subject.remove(&info.subject);
        }
        Some(info)
    }
}

#[derive(Clone)]
pub struct InMemoryLockManager {
    table: Arc<Mutex<LockTable>>,
    config: LockConfig,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
}

impl InMemoryLockManager {
    pub fn new(config: LockConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: LockConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Arc::new(Mutex::new(LockTable::default())),
            config,
            clock,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Number of records still tracked, valid or expired
    pub async fn tracked_locks(&self) -> usize {
        self.table.lock().await.records.len()
    }

    /// Compact records whose expiration plus retention lies in the past down
    /// to their expiration time. Returns how many were compacted.
    pub async fn purge_expired(&self) -> Result<usize, LockError> {
        let now = self.clock.now();
        let mut table = self.table.lock().await;

        let mut stale = Vec::new();
        for (lock_id, info) in &table.records {
            let purge_after = add_duration(info.expires_at, self.config.expired_retention)?;
            if now > purge_after {
                stale.push(*lock_id);
            }
        }

        for lock_id in &stale {
            if let Some(info) = table.remove(lock_id) {
                table.expired.insert(info.lock_id, info.expires_at);
            }
        }

        if !stale.is_empty() {
            tracing::debug!(purged = stale.len(), "Purged expired lock records");
        }

        Ok(stale.len())
    }

    /// Run `purge_expired` every `interval` on a background task
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = manager.purge_expired().await {
                    tracing::warn!(error = %e, "Lock sweep failed");
                }
            }
        })
    }

    fn expired(&self, operation: &str, lock_id: LockId, expired_at: DateTime<Utc>) -> LockError {
        tracing::warn!(
            lock_id = %lock_id,
            expired_at = %expired_at,
            operation = operation,
            "Lock expired"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_lock_expired(operation);
        }
        LockError::Expired { lock_id, expired_at }
    }

    /// Resolve an id that has no live record: Expired if it was compacted,
    /// Invalid otherwise
    fn missing(&self, table: &LockTable, operation: &str, lock_id: &LockId) -> LockError {
        match table.expired.get(lock_id) {
            Some(expired_at) => self.expired(operation, *lock_id, *expired_at),
            None => LockError::Invalid(*lock_id),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn try_lock(&self, lock_type: &str, id: &str) -> Result<LockId, LockError> {
        let subject = LockSubject::new(lock_type, id);
        let now = self.now();
        let expires_at = add_duration(now, self.config.default_ttl)?;

        let mut table = self.table.lock().await;

        if let Some(current) = table.holder(&subject) {
            if !current.is_expired_at(now) {
                tracing::debug!(subject = %subject, holder = %current.lock_id, "Lock unavailable");
                if let Some(metrics) = &self.metrics {
                    metrics.record_lock_contention(lock_type);
                }
                return Err(LockError::Unavailable { subject });
            }
        }

        let lock_id = LockId::generate();
        table.by_subject.insert(subject.clone(), lock_id);
        table.records.insert(
            lock_id,
            LockInfo {
                lock_id,
                subject: subject.clone(),
                expires_at,
            },
        );
        drop(table);

        tracing::info!(lock_id = %lock_id, subject = %subject, expires_at = %expires_at, "Lock acquired");
        if let Some(metrics) = &self.metrics {
            metrics.record_lock_acquired(lock_type);
        }

        Ok(lock_id)
    }

    async fn check_lock(&self, lock_id: &LockId) -> Result<(), LockError> {
        let now = self.now();
        let table = self.table.lock().await;

        let info = table
            .records
            .get(lock_id)
            .ok_or_else(|| self.missing(&table, "check", lock_id))?;
        if info.is_expired_at(now) {
            return Err(self.expired("check", info.lock_id, info.expires_at));
        }

        Ok(())
    }

    async fn release_lock(&self, lock_id: &LockId) -> Result<(), LockError> {
        let mut table = self.table.lock().await;

        let subject = match table.remove(lock_id) {
            Some(info) => Some(info.subject),
            None if table.expired.remove(lock_id).is_some() => None,
            None => {
                tracing::warn!(lock_id = %lock_id, "Release of unknown or already released lock");
                return Err(LockError::Invalid(*lock_id));
            }
        };
        drop(table);

        match subject {
            Some(subject) => tracing::info!(lock_id = %lock_id, subject = %subject, "Lock released"),
            None => tracing::info!(lock_id = %lock_id, "Expired lock released"),
        }
        if let Some(metrics) = &self.metrics {
            metrics.locks_released.inc();
        }

        Ok(())
    }

    async fn extend_lock_expiration(&self, lock_id: &LockId, increment: Duration) -> Result<(), LockError> {
        let now = self.now();
        let mut table = self.table.lock().await;

        let info = table
            .records
            .get(lock_id)
            .ok_or_else(|| self.missing(&table, "extend", lock_id))?;
        if info.is_expired_at(now) {
            return Err(self.expired("extend", info.lock_id, info.expires_at));
        }

        let expires_at = add_duration(info.expires_at, increment)?;
        if let Some(info) = table.records.get_mut(lock_id) {
            info.expires_at = expires_at;
        }
        drop(table);

        tracing::debug!(lock_id = %lock_id, expires_at = %expires_at, "Lock expiration extended");
        if let Some(metrics) = &self.metrics {
            metrics.locks_extended.inc();
        }

        Ok(())
    }

    async fn lock_info(&self, lock_id: &LockId) -> Result<LockInfo, LockError> {
        let table = self.table.lock().await;
        table
            .records
            .get(lock_id)
            .cloned()
            .ok_or_else(|| self.missing(&table, "info", lock_id))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
