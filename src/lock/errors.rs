use chrono::{DateTime, Utc};

use super::lock_id::{LockId, LockSubject};
use crate::utils::IsTransient;

// ============================================================================
// Lock Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LockError {
    #[error("Lock unavailable: {subject} is already locked")]
    Unavailable { subject: LockSubject },

    #[error("Lock is unknown or already released: {0}")]
    Invalid(LockId),

    #[error("Lock {lock_id} expired at {expired_at}")]
    Expired {
        lock_id: LockId,
        expired_at: DateTime<Utc>,
    },

    #[error("Lock duration out of range")]
    InvalidDuration,

    #[error("Lock store error: {0}")]
    Store(String),
}

impl IsTransient for LockError {
    fn is_transient(&self) -> bool {
        // Contention is reported to the caller, never retried: a held lock
        // belongs to an edit session that may last minutes.
        matches!(self, LockError::Store(_))
    }
}

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_failures_are_transient() {
        let subject = LockSubject::new("Order", "10");
        assert!(!LockError::Unavailable { subject }.is_transient());
        assert!(!LockError::Invalid(LockId::generate()).is_transient());
        assert!(LockError::Store("connection reset".to_string()).is_transient());
    }
}
