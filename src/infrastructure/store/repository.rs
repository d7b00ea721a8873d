use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::infrastructure::core::{AggregateRoot, INITIAL_VERSION};
use crate::utils::IsTransient;

// ============================================================================
// Generic Repository - Load and version-checked save
// ============================================================================
//
// Responsibilities:
// 1. Load the latest committed aggregate by id
// 2. Save with a compare-and-swap on the version: the stored version must
//    equal the version the aggregate was loaded at
// 3. Advance the version on every successful commit
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Aggregate not found: {0}")]
    NotFound(String),

    #[error("Aggregate already exists: {0}")]
    Duplicate(String),

    #[error("Concurrent modification of {aggregate_id}: expected version {expected}, but current is {actual}")]
    ConcurrentModification {
        aggregate_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl IsTransient for RepositoryError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::ConcurrentModification { .. } | RepositoryError::Storage(_)
        )
    }
}

#[async_trait]
pub trait Repository<A: AggregateRoot>: Send + Sync {
    async fn load(&self, id: &A::Id) -> Result<A, RepositoryError>;

    /// Commit the aggregate. Returns it stamped with the new version.
    async fn save(&self, aggregate: A) -> Result<A, RepositoryError>;

    async fn exists(&self, id: &A::Id) -> Result<bool, RepositoryError>;
}

/// Thread-safe in-memory repository
pub struct InMemoryRepository<A: AggregateRoot> {
    aggregates: Arc<RwLock<HashMap<A::Id, A>>>,
}

impl<A: AggregateRoot> InMemoryRepository<A> {
    pub fn new() -> Self {
        Self {
            aggregates: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Currently committed version, if any
    pub async fn current_version(&self, id: &A::Id) -> Option<i64> {
        self.aggregates.read().await.get(id).map(<A as AggregateRoot>::version)
    }
}

impl<A: AggregateRoot> Clone for InMemoryRepository<A> {
    fn clone(&self) -> Self {
        Self {
            aggregates: self.aggregates.clone(),
        }
    }
}

impl<A: AggregateRoot> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: AggregateRoot + Clone + 'static,
{
    async fn load(&self, id: &A::Id) -> Result<A, RepositoryError> {
        let aggregates = self.aggregates.read().await;
        aggregates
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn save(&self, aggregate: A) -> Result<A, RepositoryError> {
        let id = aggregate.aggregate_id().clone();
        let expected = aggregate.version();

        let mut aggregates = self.aggregates.write().await;

        match aggregates.get(&id) {
            None if expected != INITIAL_VERSION => {
                return Err(RepositoryError::NotFound(id.to_string()));
            }
            Some(stored) if expected == INITIAL_VERSION => {
                tracing::warn!(aggregate_id = %id, version = stored.version(), "Insert of existing aggregate");
                return Err(RepositoryError::Duplicate(id.to_string()));
            }
            Some(stored) if !stored.match_version(expected) => {
                tracing::warn!(
                    aggregate_id = %id,
                    expected = expected,
                    actual = stored.version(),
                    "Concurrency conflict on save"
                );
                return Err(RepositoryError::ConcurrentModification {
                    aggregate_id: id.to_string(),
                    expected,
                    actual: stored.version(),
                });
            }
            _ => {}
        }

        let committed = aggregate.with_committed_version(expected + 1);
        aggregates.insert(id.clone(), committed.clone());

        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            aggregate_id = %id,
            new_version = committed.version(),
            "Committed aggregate"
        );

        Ok(committed)
    }

    async fn exists(&self, id: &A::Id) -> Result<bool, RepositoryError> {
        Ok(self.aggregates.read().await.contains_key(id))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
