//! Purchase-order aggregate guarded by optimistic versioning and a
//! pessimistic lock manager, emitting domain events on every change.

pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod lock;
pub mod metrics;
pub mod utils;
