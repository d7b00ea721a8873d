// ============================================================================
// Aggregate Infrastructure
// ============================================================================
//
// Generic, reusable infrastructure: the version-guarded aggregate contract,
// event envelopes, the repository collaborator and the event dispatcher.
// Domain-specific code is in src/domain/
//
// ============================================================================

pub mod core;
pub mod dispatch;
pub mod store;

pub use self::core::*;
pub use dispatch::*;
pub use store::*;
