use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::infrastructure::core::{DomainEvent, EventEnvelope};

// ============================================================================
// Event Dispatcher - Hand-off point for emitted events
// ============================================================================
//
// The core hands every committed event to a dispatcher exactly once.
// Ordering and delivery guarantees beyond that belong to the dispatcher.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatcher is closed")]
    Closed,

    #[error("Failed to dispatch event: {0}")]
    Failed(String),
}

#[async_trait]
pub trait EventDispatcher<E: DomainEvent>: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope<E>) -> Result<(), DispatchError>;
}

/// Fans events out to in-process subscribers over a broadcast channel.
/// Publishing with nobody subscribed succeeds and the event is dropped.
#[derive(Clone)]
pub struct BroadcastEventDispatcher<E: DomainEvent> {
    sender: broadcast::Sender<EventEnvelope<E>>,
}

impl<E: DomainEvent> BroadcastEventDispatcher<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<E>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: DomainEvent> Default for BroadcastEventDispatcher<E> {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl<E: DomainEvent> EventDispatcher<E> for BroadcastEventDispatcher<E> {
    async fn publish(&self, envelope: EventEnvelope<E>) -> Result<(), DispatchError> {
        let event_type = envelope.event_type.clone();
        let aggregate_id = envelope.aggregate_id.clone();

        match self.sender.send(envelope) {
            Ok(receivers) => {
                tracing::debug!(
                    event_type = %event_type,
                    aggregate_id = %aggregate_id,
                    receivers = receivers,
                    "Dispatched event"
                );
            }
            Err(_) => {
                tracing::debug!(
                    event_type = %event_type,
                    aggregate_id = %aggregate_id,
                    "No subscribers for event"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Pinged {
        at: DateTime<Utc>,
    }

    impl DomainEvent for Pinged {
        fn event_type(&self) -> &'static str {
            "Pinged"
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    fn envelope(seq: i64) -> EventEnvelope<Pinged> {
        EventEnvelope::new("Ping", "p-1", seq, Pinged { at: Utc::now() }, Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let dispatcher = BroadcastEventDispatcher::<Pinged>::new(16);
        let mut receiver = dispatcher.subscribe();

        dispatcher.publish(envelope(1)).await.unwrap();
        dispatcher.publish(envelope(2)).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap().sequence_number, 1);
        assert_eq!(receiver.recv().await.unwrap().sequence_number, 2);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let dispatcher = BroadcastEventDispatcher::<Pinged>::default();
        assert_eq!(dispatcher.subscriber_count(), 0);
        assert!(dispatcher.publish(envelope(1)).await.is_ok());
    }
}
