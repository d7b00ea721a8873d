// ============================================================================
// Lock Manager - Pessimistic locking for multi-request edit sessions
// ============================================================================
//
// This module contains:
// - Lock identity types (LockId, LockSubject, LockInfo)
// - Errors (LockError)
// - Configuration (LockConfig)
// - The LockManager contract
// - Backends: in-process table and shared Redis store
//
// ============================================================================

pub mod config;
pub mod errors;
pub mod lock_id;
pub mod manager;
pub mod memory;
pub mod redis_store;

pub use config::LockConfig;
pub use errors::LockError;
pub use lock_id::{LockId, LockInfo, LockSubject};
pub use manager::LockManager;
pub use memory::InMemoryLockManager;
pub use redis_store::RedisLockManager;
