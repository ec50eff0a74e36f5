//! Downstream publisher using Redis Streams.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::QueueResult;

/// Default topic consumed by the identification service.
pub const DEFAULT_TOPIC: &str = "process-identities";

/// Stream field carrying the message body.
pub const PAYLOAD_FIELD: &str = "payload";

/// At-least-once message publisher. No ordering is promised across calls.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` to `topic`, returning the broker's message id.
    async fn publish(&self, topic: &str, payload: &[u8]) -> QueueResult<String>;

    /// Verify the broker is reachable.
    async fn check_connectivity(&self) -> QueueResult<()> {
        Ok(())
    }
}

/// Serialize `value` as JSON and publish it.
pub async fn publish_json<T: Serialize + ?Sized>(
    publisher: &dyn Publisher,
    topic: &str,
    value: &T,
) -> QueueResult<String> {
    let payload = serde_json::to_vec(value)?;
    publisher.publish(topic, &payload).await
}

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Redis URL
    pub redis_url: String,
    /// Approximate cap on stream length; 0 disables trimming
    pub max_len: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            max_len: 100_000,
        }
    }
}

impl PublisherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            max_len: std::env::var("PUBLISH_STREAM_MAXLEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100_000),
        }
    }
}

/// Publisher appending one stream entry per message (`XADD <topic>`).
pub struct RedisStreamPublisher {
    client: redis::Client,
    config: PublisherConfig,
}

impl RedisStreamPublisher {
    pub fn new(config: PublisherConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(PublisherConfig::from_env())
    }

    fn xadd(&self, topic: &str, payload: &[u8]) -> redis::Cmd {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(topic);
        if self.config.max_len > 0 {
            cmd.arg("MAXLEN").arg("~").arg(self.config.max_len);
        }
        cmd.arg("*").arg(PAYLOAD_FIELD).arg(payload);
        cmd
    }
}

#[async_trait]
impl Publisher for RedisStreamPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let message_id: String = self.xadd(topic, payload).query_async(&mut conn).await?;

        debug!(
            topic = topic,
            message_id = %message_id,
            bytes = payload.len(),
            "Published message"
        );
        Ok(message_id)
    }

    async fn check_connectivity(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis connectivity verified");
        Ok(())
    }
}
