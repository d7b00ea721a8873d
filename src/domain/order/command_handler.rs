use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::aggregate::Order;
use super::commands::{OrderCommand, PlaceOrder};
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{OrderNo, ShippingInfo};
use crate::infrastructure::core::{AggregateRoot, DomainEvent, EventEnvelope};
use crate::infrastructure::dispatch::{DispatchError, EventDispatcher};
use crate::infrastructure::store::{Repository, RepositoryError};
use crate::common::{Clock, SystemClock};
use crate::lock::{LockError, LockId, LockManager, LockSubject};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

// ============================================================================
// Order Service - Use cases over the Order aggregate
// ============================================================================
//
// Orchestrates: [Lock] → Load → Version check → Command → Save (CAS) → Publish
//
// Two concurrency strategies:
// - Optimistic: the caller supplies the version it last saw; a mismatch is
//   rejected before mutating, and the repository's CAS catches races after.
// - Pessimistic: an edit session holds a lock on ("Order", number); every
//   command under it re-checks the lock and the version the editor last saw,
//   so writes that bypassed the lock still surface as conflicts. The
//   repository CAS stays the final gate.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Version conflict on order {order_number}: expected {expected}, but current is {actual}")]
    VersionConflict {
        order_number: OrderNo,
        expected: i64,
        actual: i64,
    },

    #[error("Lock {lock_id} does not cover order {order_number}")]
    LockSubjectMismatch { lock_id: LockId, order_number: OrderNo },
}

impl IsTransient for ServiceError {
    fn is_transient(&self) -> bool {
        match self {
            ServiceError::Lock(e) => e.is_transient(),
            ServiceError::Repository(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// A held lock together with the order state seen when it was taken
#[derive(Debug, Clone)]
pub struct EditSession {
    pub lock_id: LockId,
    pub order: Order,
}

pub struct OrderService {
    repository: Arc<dyn Repository<Order>>,
    lock_manager: Arc<dyn LockManager>,
    dispatcher: Arc<dyn EventDispatcher<OrderEvent>>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
}

impl OrderService {
    pub fn new(
        repository: Arc<dyn Repository<Order>>,
        lock_manager: Arc<dyn LockManager>,
        dispatcher: Arc<dyn EventDispatcher<OrderEvent>>,
    ) -> Self {
        Self {
            repository,
            lock_manager,
            dispatcher,
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    /// Source of order dates and event timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn place_order(&self, command: PlaceOrder) -> Result<Order, ServiceError> {
        let (order, event) = Order::place(command, self.clock.now()).map_err(|e| self.rejected(e))?;
        let order = self.repository.save(order).await?;

        tracing::info!(
            order_number = %order.number(),
            total = %order.total_amounts(),
            "Order placed"
        );

        self.publish(&order, event, None).await?;
        Ok(order)
    }

    pub async fn load(&self, order_number: &OrderNo) -> Result<Order, ServiceError> {
        Ok(self.repository.load(order_number).await?)
    }

    pub async fn change_shipping_info(
        &self,
        order_number: &OrderNo,
        expected_version: i64,
        shipping_info: ShippingInfo,
    ) -> Result<Order, ServiceError> {
        let command = OrderCommand::ChangeShippingInfo { shipping_info };
        self.execute(order_number, expected_version, &command).await
    }

    pub async fn cancel(&self, order_number: &OrderNo, expected_version: i64) -> Result<Order, ServiceError> {
        self.execute(order_number, expected_version, &OrderCommand::Cancel).await
    }

    pub async fn start_shipping(&self, order_number: &OrderNo, expected_version: i64) -> Result<Order, ServiceError> {
        self.execute(order_number, expected_version, &OrderCommand::StartShipping).await
    }

    /// Optimistic mode: reject if the order moved past `expected_version`
    pub async fn execute(
        &self,
        order_number: &OrderNo,
        expected_version: i64,
        command: &OrderCommand,
    ) -> Result<Order, ServiceError> {
        self.apply(order_number, Some(expected_version), command, None).await
    }

    /// Reload and re-apply on lost updates or lock contention.
    /// Domain rule violations are returned immediately.
    pub async fn execute_with_retry(
        &self,
        order_number: &OrderNo,
        command: &OrderCommand,
        config: RetryConfig,
    ) -> Result<Order, ServiceError> {
        let operation = command.name();

        let result = retry_on_transient(config, move |attempt| {
            if let Some(metrics) = &self.metrics {
                metrics.record_retry_attempt(operation, attempt);
            }
            self.apply(order_number, None, command, None)
        })
        .await
        .into_result();

        if let Some(metrics) = &self.metrics {
            metrics.record_retry_outcome(operation, result.is_ok());
        }

        result
    }

    // ------------------------------------------------------------------------
    // Pessimistic edit sessions
    // ------------------------------------------------------------------------

    /// Lock the order for a multi-request edit and return its current state
    pub async fn begin_edit(&self, order_number: &OrderNo) -> Result<EditSession, ServiceError> {
        let lock_id = self
            .lock_manager
            .try_lock(Order::aggregate_type(), order_number.as_str())
            .await?;

        match self.repository.load(order_number).await {
            Ok(order) => {
                tracing::info!(order_number = %order_number, lock_id = %lock_id, "Edit session started");
                Ok(EditSession { lock_id, order })
            }
            Err(e) => {
                if let Err(release_err) = self.lock_manager.release_lock(&lock_id).await {
                    tracing::warn!(lock_id = %lock_id, error = %release_err, "Failed to release lock after load error");
                }
                Err(e.into())
            }
        }
    }

    /// Apply a command while holding the session lock.
    /// `expected_version` is the version the editor last saw: the session's
    /// order at first, then whatever the previous locked command returned.
    pub async fn execute_locked(
        &self,
        lock_id: &LockId,
        order_number: &OrderNo,
        expected_version: i64,
        command: &OrderCommand,
    ) -> Result<Order, ServiceError> {
        self.lock_manager.check_lock(lock_id).await?;

        let info = self.lock_manager.lock_info(lock_id).await?;
        if info.subject != LockSubject::new(Order::aggregate_type(), order_number.as_str()) {
            return Err(ServiceError::LockSubjectMismatch {
                lock_id: *lock_id,
                order_number: order_number.clone(),
            });
        }

        self.apply(order_number, Some(expected_version), command, Some(lock_id)).await
    }

    pub async fn extend_edit(&self, lock_id: &LockId, increment: Duration) -> Result<(), ServiceError> {
        Ok(self.lock_manager.extend_lock_expiration(lock_id, increment).await?)
    }

    pub async fn end_edit(&self, lock_id: &LockId) -> Result<(), ServiceError> {
        self.lock_manager.release_lock(lock_id).await?;
        tracing::info!(lock_id = %lock_id, "Edit session ended");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn apply(
        &self,
        order_number: &OrderNo,
        expected_version: Option<i64>,
        command: &OrderCommand,
        lock_id: Option<&LockId>,
    ) -> Result<Order, ServiceError> {
        let mut order = self.repository.load(order_number).await?;

        if let Some(expected) = expected_version {
            if !order.match_version(expected) {
                tracing::warn!(
                    order_number = %order_number,
                    expected = expected,
                    actual = order.version(),
                    "Stale order version"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.version_conflicts.inc();
                }
                return Err(ServiceError::VersionConflict {
                    order_number: order_number.clone(),
                    expected,
                    actual: order.version(),
                });
            }
        }

        let event = order.handle_command(command, self.clock.now()).map_err(|e| self.rejected(e))?;

        let order = match self.repository.save(order).await {
            Ok(order) => order,
            Err(e) => {
                if matches!(e, RepositoryError::ConcurrentModification { .. }) {
                    if let Some(metrics) = &self.metrics {
                        metrics.version_conflicts.inc();
                    }
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            order_number = %order_number,
            command = command.name(),
            state = ?order.state(),
            version = order.version(),
            "Order command applied"
        );

        self.publish(&order, event, lock_id).await?;
        Ok(order)
    }

    async fn publish(&self, order: &Order, event: OrderEvent, lock_id: Option<&LockId>) -> Result<(), ServiceError> {
        let event_type = event.event_type();

        let mut envelope = EventEnvelope::new(
            Order::aggregate_type(),
            order.number().as_str(),
            order.version(),
            event,
            Uuid::new_v4(),
        );
        if let Some(lock_id) = lock_id {
            envelope = envelope.with_metadata("lock_id", lock_id.to_string());
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_transition(event_type);
        }

        if let Err(e) = self.dispatcher.publish(envelope).await {
            tracing::error!(
                order_number = %order.number(),
                event_type = event_type,
                error = %e,
                "Order committed but event dispatch failed"
            );
            return Err(e.into());
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_event_published(event_type);
        }
        Ok(())
    }

    fn rejected(&self, error: OrderError) -> ServiceError {
        tracing::debug!(reason = error.reason(), error = %error, "Order command rejected");
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(error.reason());
        }
        ServiceError::Order(error)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
