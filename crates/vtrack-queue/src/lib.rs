//! Downstream message publishing.
//!
//! Crop batches are appended to a Redis stream named after the topic, one
//! entry per batch with the JSON body under the `payload` field.

pub mod error;
pub mod publisher;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use error::{QueueError, QueueResult};
pub use publisher::{
    publish_json, Publisher, PublisherConfig, RedisStreamPublisher, DEFAULT_TOPIC, PAYLOAD_FIELD,
};

#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryPublisher, PublishedMessage};
