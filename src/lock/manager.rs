use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

use super::errors::LockError;
use super::lock_id::{LockId, LockInfo, LockSubject};

// ============================================================================
// Lock Manager - Pessimistic lease protocol
// ============================================================================
//
// Contract shared by every backend:
// - try_lock fails fast with Unavailable while a valid lock exists for the
//   same (type, id); it never blocks or queues.
// - check_lock fails with Invalid for unknown/released ids and with Expired
//   once now > expiration.
// - release_lock fails with Invalid for unknown/released ids, so a second
//   release is reported as misuse.
// - extend_lock_expiration pushes the expiration forward by an increment;
//   expired locks cannot be resurrected.
// - At most one LockId is valid per subject at any instant.
//
// ============================================================================

#[async_trait]
pub trait LockManager: Send + Sync {
    async fn try_lock(&self, lock_type: &str, id: &str) -> Result<LockId, LockError>;

    async fn check_lock(&self, lock_id: &LockId) -> Result<(), LockError>;

    async fn release_lock(&self, lock_id: &LockId) -> Result<(), LockError>;

    async fn extend_lock_expiration(&self, lock_id: &LockId, increment: Duration) -> Result<(), LockError>;

    /// Resolve a LockId back to its subject and expiration
    async fn lock_info(&self, lock_id: &LockId) -> Result<LockInfo, LockError>;

    async fn try_lock_subject(&self, subject: &LockSubject) -> Result<LockId, LockError> {
        self.try_lock(&subject.lock_type, &subject.id).await
    }
}

pub(crate) fn to_delta(duration: Duration) -> Result<TimeDelta, LockError> {
    TimeDelta::from_std(duration).map_err(|_| LockError::InvalidDuration)
}

pub(crate) fn add_duration(instant: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, LockError> {
    instant
        .checked_add_signed(to_delta(duration)?)
        .ok_or(LockError::InvalidDuration)
}
