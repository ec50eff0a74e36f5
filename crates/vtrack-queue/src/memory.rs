//! In-memory publisher for tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{QueueError, QueueResult};
use crate::publisher::Publisher;

/// One published message.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// `Publisher` that records messages in order. Publishes can be made to
/// fail a fixed number of times to exercise retries.
#[derive(Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    failing_publishes: AtomicU32,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` publishes with a retryable error.
    pub fn fail_next_publishes(&self, n: u32) {
        self.failing_publishes.store(n, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Decode every payload published to `topic` as JSON.
    pub fn decoded<T: DeserializeOwned>(&self, topic: &str) -> Vec<T> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .filter_map(|m| serde_json::from_slice(&m.payload).ok())
            .collect()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> QueueResult<String> {
        let should_fail = self
            .failing_publishes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(QueueError::publish_failed("injected failure"));
        }

        let mut messages = self
            .messages
            .lock()
            .map_err(|_| QueueError::publish_failed("publisher lock poisoned"))?;
        messages.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(format!("{}-0", messages.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::publish_json;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_messages_in_order() {
        let publisher = MemoryPublisher::new();
        publish_json(&publisher, "t", &json!({"n": 1})).await.unwrap();
        publish_json(&publisher, "other", &json!({"n": 2})).await.unwrap();
        publish_json(&publisher, "t", &json!({"n": 3})).await.unwrap();

        let decoded: Vec<serde_json::Value> = publisher.decoded("t");
        assert_eq!(decoded, vec![json!({"n": 1}), json!({"n": 3})]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let publisher = MemoryPublisher::new();
        publisher.fail_next_publishes(1);

        let err = publisher.publish("t", b"x").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(publisher.publish("t", b"x").await.is_ok());
        assert_eq!(publisher.messages().len(), 1);
    }
}
