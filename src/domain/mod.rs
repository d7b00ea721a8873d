// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Value objects
// - Events
// - Commands
// - Errors
// - Aggregate implementation
// - Use-case service
//
// This layer knows nothing about how aggregates are stored or how events
// are delivered.
//
// ============================================================================

pub mod order;
