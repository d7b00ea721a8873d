use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redis::aio::MultiplexedConnection;
use redis::Script;
use std::sync::Arc;
use std::time::Duration;

use super::config::LockConfig;
use super::errors::LockError;
use super::lock_id::{LockId, LockInfo, LockSubject};
use super::manager::{add_duration, LockManager};
use crate::common::{Clock, SystemClock};
use crate::metrics::Metrics;

// ============================================================================
// Redis Lock Manager - Shared lock table for multi-process deployments
// ============================================================================
//
// Key layout:
// - {prefix}:{type}:{id}     -> LockId, PX = remaining TTL + 1ms. Present
//                               means held; it outlives expires_at by one
//                               tick because expiry is strict (now > expires_at)
// - {prefix}-id:{lock_id}    -> hash {lock_type, id, expires_at(ms)}, kept
//                               until released so an abandoned id keeps
//                               answering Expired
//
// Every mutation runs as a single Lua script so it is atomic in Redis.
// Expiration is judged against the caller's clock; hosts sharing a store
// are expected to keep their clocks in sync.
//
// ============================================================================

const TRY_LOCK_SCRIPT: &str = r"
if redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2]) then
  redis.call('HSET', KEYS[2], 'lock_type', ARGV[3], 'id', ARGV[4], 'expires_at', ARGV[5])
  return 1
end
return 0
";

const RELEASE_SCRIPT: &str = r"
if redis.call('DEL', KEYS[2]) == 0 then
  return 0
end
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('DEL', KEYS[1])
end
return 1
";

// -1: unknown, -2: expired, otherwise the new expiration in ms
const EXTEND_SCRIPT: &str = r"
local expires_at = redis.call('HGET', KEYS[2], 'expires_at')
if not expires_at then
  return -1
end
expires_at = tonumber(expires_at)
local now = tonumber(ARGV[2])
if now > expires_at then
  return -2
end
local new_expires = expires_at + tonumber(ARGV[3])
local subject_ttl = string.format('%d', new_expires - now + 1)
redis.call('HSET', KEYS[2], 'expires_at', string.format('%d', new_expires))
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('PEXPIRE', KEYS[1], subject_ttl)
else
  redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', subject_ttl)
end
return new_expires
";

#[derive(Clone)]
pub struct RedisLockManager {
    conn: MultiplexedConnection,
    config: LockConfig,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
    try_lock_script: Script,
    release_script: Script,
    extend_script: Script,
}

impl RedisLockManager {
    pub async fn connect(url: &str, config: LockConfig) -> Result<Self, LockError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        tracing::info!(url = url, prefix = %config.key_prefix, "Connected Redis lock store");

        Ok(Self::from_connection(conn, config, Arc::new(SystemClock)))
    }

    pub fn from_connection(conn: MultiplexedConnection, config: LockConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn,
            config,
            clock,
            metrics: None,
            try_lock_script: Script::new(TRY_LOCK_SCRIPT),
            release_script: Script::new(RELEASE_SCRIPT),
            extend_script: Script::new(EXTEND_SCRIPT),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn subject_key(&self, subject: &LockSubject) -> String {
        format!("{}:{}:{}", self.config.key_prefix, subject.lock_type, subject.id)
    }

    fn record_key(&self, lock_id: &LockId) -> String {
        format!("{}-id:{}", self.config.key_prefix, lock_id)
    }

    async fn read_record(&self, lock_id: &LockId) -> Result<LockInfo, LockError> {
        let mut conn = self.conn.clone();
        let (lock_type, id, expires_at): (Option<String>, Option<String>, Option<i64>) = redis::cmd("HMGET")
            .arg(self.record_key(lock_id))
            .arg("lock_type")
            .arg("id")
            .arg("expires_at")
            .query_async(&mut conn)
            .await?;

        match (lock_type, id, expires_at) {
            (Some(lock_type), Some(id), Some(expires_at)) => Ok(LockInfo {
                lock_id: *lock_id,
                subject: LockSubject { lock_type, id },
                expires_at: from_millis(expires_at)?,
            }),
            _ => Err(LockError::Invalid(*lock_id)),
        }
    }

    fn expired(&self, operation: &str, info: &LockInfo) -> LockError {
        tracing::warn!(
            lock_id = %info.lock_id,
            subject = %info.subject,
            expired_at = %info.expires_at,
            operation = operation,
            "Lock expired"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_lock_expired(operation);
        }
        LockError::Expired {
            lock_id: info.lock_id,
            expired_at: info.expires_at,
        }
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, LockError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| LockError::Store(format!("corrupt expiration: {}", millis)))
}

fn millis(duration: Duration) -> Result<i64, LockError> {
    i64::try_from(duration.as_millis()).map_err(|_| LockError::InvalidDuration)
}

/// The subject key must still exist at now == expires_at
fn subject_ttl(ttl: Duration) -> Result<i64, LockError> {
    millis(ttl)?.checked_add(1).ok_or(LockError::InvalidDuration)
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn try_lock(&self, lock_type: &str, id: &str) -> Result<LockId, LockError> {
        let subject = LockSubject::new(lock_type, id);
        let lock_id = LockId::generate();
        let expires_at = add_duration(self.clock.now(), self.config.default_ttl)?;
        let subject_ttl_ms = subject_ttl(self.config.default_ttl)?;

        let mut conn = self.conn.clone();
        let acquired: i64 = self
            .try_lock_script
            .key(self.subject_key(&subject))
            .key(self.record_key(&lock_id))
            .arg(lock_id.to_string())
            .arg(subject_ttl_ms)
            .arg(lock_type)
            .arg(id)
            .arg(expires_at.timestamp_millis())
            .invoke_async(&mut conn)
            .await?;

        if acquired == 0 {
            tracing::debug!(subject = %subject, "Lock unavailable");
            if let Some(metrics) = &self.metrics {
                metrics.record_lock_contention(lock_type);
            }
            return Err(LockError::Unavailable { subject });
        }

        tracing::info!(lock_id = %lock_id, subject = %subject, expires_at = %expires_at, "Lock acquired");
        if let Some(metrics) = &self.metrics {
            metrics.record_lock_acquired(lock_type);
        }

        Ok(lock_id)
    }

    async fn check_lock(&self, lock_id: &LockId) -> Result<(), LockError> {
        let info = self.read_record(lock_id).await?;
        if info.is_expired_at(self.clock.now()) {
            return Err(self.expired("check", &info));
        }
        Ok(())
    }

    async fn release_lock(&self, lock_id: &LockId) -> Result<(), LockError> {
        let info = self.read_record(lock_id).await?;

        let mut conn = self.conn.clone();
        let released: i64 = self
            .release_script
            .key(self.subject_key(&info.subject))
            .key(self.record_key(lock_id))
            .arg(lock_id.to_string())
            .invoke_async(&mut conn)
            .await?;

        if released == 0 {
            tracing::warn!(lock_id = %lock_id, "Release of unknown or already released lock");
            return Err(LockError::Invalid(*lock_id));
        }

        tracing::info!(lock_id = %lock_id, subject = %info.subject, "Lock released");
        if let Some(metrics) = &self.metrics {
            metrics.locks_released.inc();
        }

        Ok(())
    }

    async fn extend_lock_expiration(&self, lock_id: &LockId, increment: Duration) -> Result<(), LockError> {
        let info = self.read_record(lock_id).await?;
        let now = self.clock.now();

        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .extend_script
            .key(self.subject_key(&info.subject))
            .key(self.record_key(lock_id))
            .arg(lock_id.to_string())
            .arg(now.timestamp_millis())
            .arg(millis(increment)?)
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            -1 => Err(LockError::Invalid(*lock_id)),
            -2 => Err(self.expired("extend", &info)),
            new_expires => {
                tracing::debug!(lock_id = %lock_id, expires_at = %from_millis(new_expires)?, "Lock expiration extended");
                if let Some(metrics) = &self.metrics {
                    metrics.locks_extended.inc();
                }
                Ok(())
            }
        }
    }

    async fn lock_info(&self, lock_id: &LockId) -> Result<LockInfo, LockError> {
        self.read_record(lock_id).await
    }
}
