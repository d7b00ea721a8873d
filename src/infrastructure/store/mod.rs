// ============================================================================
// Aggregate Store - Generic Persistence Layer
// ============================================================================

pub mod repository;

pub use repository::{InMemoryRepository, Repository, RepositoryError};
