use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Event Envelope - Event Metadata
// ============================================================================
//
// Wraps domain events with the metadata a dispatcher needs.
// This is GENERIC and works with ANY event type.
//
// ============================================================================

/// Generic Event Envelope - wraps any domain event with metadata
///
/// Type Parameter:
/// - `E`: The domain event type (must implement DomainEvent trait)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    /// Aggregate version committed together with this event
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,
    pub event_version: i32,

    // Event Payload
    pub event_data: E,

    // Groups events produced by one use-case invocation
    pub correlation_id: Uuid,

    // Timing
    pub timestamp: DateTime<Utc>,

    // Additional Metadata
    pub metadata: HashMap<String, String>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(
        aggregate_type: &str,
        aggregate_id: impl Into<String>,
        sequence_number: i64,
        event_data: E,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: aggregate_id.into(),
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_version: E::event_version(),
            timestamp: event_data.occurred_at(),
            event_data,
            correlation_id,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Generic Domain Event trait
///
/// Events are immutable values; everything a subscriber needs travels inside.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;

    fn event_version() -> i32
    where
        Self: Sized,
    {
        1
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct TestEvent {
        data: String,
        at: DateTime<Utc>,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "TestEvent"
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn test_event_envelope_creation() {
        let correlation_id = Uuid::new_v4();
        let at = Utc::now();

        let envelope = EventEnvelope::new(
            "Test",
            "42",
            1,
            TestEvent { data: "test".to_string(), at },
            correlation_id,
        )
        .with_metadata("lock_id", "abc");

        assert_eq!(envelope.aggregate_type, "Test");
        assert_eq!(envelope.aggregate_id, "42");
        assert_eq!(envelope.sequence_number, 1);
        assert_eq!(envelope.event_type, "TestEvent");
        assert_eq!(envelope.event_version, 1);
        assert_eq!(envelope.timestamp, at);
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.metadata.get("lock_id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = EventEnvelope::new(
            "Test",
            "42",
            3,
            TestEvent { data: "payload".to_string(), at: Utc::now() },
            Uuid::new_v4(),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        let deserialized: EventEnvelope<TestEvent> = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.event_id, envelope.event_id);
        assert_eq!(deserialized.event_data.data, "payload");
    }
}
