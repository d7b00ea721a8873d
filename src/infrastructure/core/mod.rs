// ============================================================================
// Aggregate Core - Generic Abstractions
// ============================================================================
//
// No domain-specific code (no Order types).
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::{AggregateRoot, INITIAL_VERSION};
pub use event::{DomainEvent, EventEnvelope};
