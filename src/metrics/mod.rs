use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Lock acquisition, contention, release, extension and expiry
// - Order lifecycle transitions and rejected commands
// - Optimistic concurrency conflicts
// - Published domain events
// - Retry attempts and outcomes
//
// The registry is exposed so a host process can serve it however it likes.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Lock Metrics
    pub locks_acquired: IntCounterVec,
    pub lock_contention: IntCounterVec,
    pub locks_released: IntCounter,
    pub locks_extended: IntCounter,
    pub locks_expired: IntCounterVec,

    // Order Metrics
    pub order_transitions: IntCounterVec,
    pub order_rejections: IntCounterVec,
    pub version_conflicts: IntCounter,
    pub events_published: IntCounterVec,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,
    pub retry_success: IntCounterVec,
    pub retry_failure: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let locks_acquired = IntCounterVec::new(
            Opts::new("locks_acquired_total", "Total locks acquired"),
            &["lock_type"],
        )?;
        registry.register(Box::new(locks_acquired.clone()))?;

        let lock_contention = IntCounterVec::new(
            Opts::new("lock_contention_total", "Lock attempts refused because the subject was held"),
            &["lock_type"],
        )?;
        registry.register(Box::new(lock_contention.clone()))?;

        let locks_released = IntCounter::new("locks_released_total", "Total locks released")?;
        registry.register(Box::new(locks_released.clone()))?;

        let locks_extended = IntCounter::new("locks_extended_total", "Total lock expiration extensions")?;
        registry.register(Box::new(locks_extended.clone()))?;

        let locks_expired = IntCounterVec::new(
            Opts::new("locks_expired_total", "Operations that found their lock expired"),
            &["operation"],
        )?;
        registry.register(Box::new(locks_expired.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Successful order state changes"),
            &["event_type"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_rejections = IntCounterVec::new(
            Opts::new("order_rejections_total", "Order commands rejected by a guard"),
            &["reason"],
        )?;
        registry.register(Box::new(order_rejections.clone()))?;

        let version_conflicts = IntCounter::new(
            "version_conflicts_total",
            "Writes rejected by the optimistic version check",
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Domain events handed to the dispatcher"),
            &["event_type"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_success = IntCounterVec::new(
            Opts::new("retry_success_total", "Total successful retries"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_success.clone()))?;

        let retry_failure = IntCounterVec::new(
            Opts::new("retry_failure_total", "Total failed retries after all attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_failure.clone()))?;

        Ok(Self {
            registry,
            locks_acquired,
            lock_contention,
            locks_released,
            locks_extended,
            locks_expired,
            order_transitions,
            order_rejections,
            version_conflicts,
            events_published,
            retry_attempts_total,
            retry_success,
            retry_failure,
        })
    }

    /// Get the Prometheus registry for exposing metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_lock_acquired(&self, lock_type: &str) {
        self.locks_acquired.with_label_values(&[lock_type]).inc();
    }

    pub fn record_lock_contention(&self, lock_type: &str) {
        self.lock_contention.with_label_values(&[lock_type]).inc();
    }

    pub fn record_lock_expired(&self, operation: &str) {
        self.locks_expired.with_label_values(&[operation]).inc();
    }

    pub fn record_transition(&self, event_type: &str) {
        self.order_transitions.with_label_values(&[event_type]).inc();
    }

    pub fn record_rejection(&self, reason: &str) {
        self.order_rejections.with_label_values(&[reason]).inc();
    }

    pub fn record_event_published(&self, event_type: &str) {
        self.events_published.with_label_values(&[event_type]).inc();
    }

    /// Helper to record retry attempt
    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        let attempt = attempt.to_string();
        self.retry_attempts_total.with_label_values(&[operation, attempt.as_str()]).inc();
    }

    /// Helper to record retry outcome
    pub fn record_retry_outcome(&self, operation: &str, success: bool) {
        if success {
            self.retry_success.with_label_values(&[operation]).inc();
        } else {
            self.retry_failure.with_label_values(&[operation]).inc();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_lock_acquired("Order");
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_lock_contention() {
        let metrics = Metrics::new().unwrap();
        metrics.record_lock_contention("Order");
        metrics.record_lock_contention("Order");

        let gathered = metrics.registry.gather();
        let contention = gathered.iter().find(|m| m.name() == "lock_contention_total").unwrap();
        assert_eq!(contention.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_transitions_by_event_type() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("ShippingStarted");
        metrics.record_transition("OrderCanceled");

        let gathered = metrics.registry.gather();
        let transitions = gathered.iter().find(|m| m.name() == "order_transitions_total").unwrap();
        assert_eq!(transitions.metric.len(), 2);
    }

    #[test]
    fn test_record_retry() {
        let metrics = Metrics::new().unwrap();
        metrics.record_retry_attempt("start_shipping", 1);
        metrics.record_retry_attempt("start_shipping", 2);
        metrics.record_retry_outcome("start_shipping", true);

        let gathered = metrics.registry.gather();
        let attempts = gathered.iter().find(|m| m.name() == "retry_attempts_total").unwrap();
        assert_eq!(attempts.metric.len(), 2); // Two different attempt labels
    }
}
