use serde_json::Value;
use tokio::sync::broadcast;

/// In-process publisher for booking workflow events and operator notifications
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl PublishedEvent {
    /// String field from the event context
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        if self.sender.send(event).is_err() {
            tracing::trace!("Published event with no subscribers");
        }
    }

    /// Serialize a payload and publish it
    pub fn publish_serialized<T: serde::Serialize>(
        &self,
        event_name: impl Into<String>,
        payload: &T,
    ) -> Result<(), PublishError> {
        let context = serde_json::to_value(payload)?;
        self.publish(event_name, context);
        Ok(())
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish("booking.session.opened", json!({}));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        publisher.publish("first", json!({"office_code": "1001"}));
        publisher.publish("second", json!({}));

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.name, "first");
        assert_eq!(first.context_str("office_code"), Some("1001"));
        assert_eq!(receiver.recv().await.unwrap().name, "second");
    }

    #[tokio::test]
    async fn test_publish_serialized() {
        #[derive(serde::Serialize)]
        struct Payload {
            barcode: &'static str,
        }

        let publisher = EventPublisher::new(4);
        let mut receiver = publisher.subscribe();
        publisher
            .publish_serialized("scan", &Payload { barcode: "123" })
            .unwrap();
        assert_eq!(receiver.recv().await.unwrap().context_str("barcode"), Some("123"));
    }
}
