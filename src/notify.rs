//! Redis Notifier
//!
//! Publishes classifier events to a Redis pub/sub channel as JSON.
//! Publication is fire-and-forget: messages go through a bounded queue and a
//! full queue drops them rather than stalling ingestion.

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::TokenRecord;

/// Default Redis channel for token lifecycle events
pub const DEFAULT_CHANNEL: &str = "token_events";

/// Messages buffered between the walker and the publish worker
pub const NOTIFY_QUEUE_CAPACITY: usize = 1024;

/// Errors that can occur during publishing
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Event topics consumers subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    NewContractCreated,
    SwapEnabled,
    Swapped,
    LpLocked,
    TokenLocked,
    LimitRemoved,
    Renounced,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::NewContractCreated => "newContractCreated",
            Topic::SwapEnabled => "swapEnabled",
            Topic::Swapped => "swapped",
            Topic::LpLocked => "lpLocked",
            Topic::TokenLocked => "tokenLocked",
            Topic::LimitRemoved => "limitRemoved",
            Topic::Renounced => "renounced",
        }
    }
}

/// Message format for Redis publication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub topic: Topic,
    /// Token record as committed
    pub record: TokenRecord,
    /// Unix timestamp in milliseconds when the event was published
    pub timestamp: u64,
}

impl Notification {
    pub fn new(topic: Topic, record: TokenRecord) -> Self {
        Self {
            topic,
            record,
            timestamp: current_timestamp_millis(),
        }
    }

    /// Serialize the message to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a message from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Get current timestamp in milliseconds
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Sink for classifier events. Must not block.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Redis publisher for notifications
pub struct Publisher {
    connection: MultiplexedConnection,
    channel: String,
}

impl Publisher {
    /// Create a new publisher with a Redis connection
    ///
    /// # Arguments
    /// * `connection` - An established Redis multiplexed connection
    /// * `channel` - The pub/sub channel name to publish to
    pub fn new(connection: MultiplexedConnection, channel: impl Into<String>) -> Self {
        Self {
            connection,
            channel: channel.into(),
        }
    }

    /// Publish a notification
    ///
    /// # Returns
    /// The number of subscribers that received the message
    pub async fn publish_message(&mut self, message: &Notification) -> Result<i64, PublishError> {
        let json = message.to_json()?;
        let subscribers: i64 = self.connection.publish(&self.channel, &json).await?;
        Ok(subscribers)
    }

    /// Get the channel name
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// [`Notifier`] that hands messages to a background [`Publisher`] task
#[derive(Clone)]
pub struct RedisNotifier {
    sender: mpsc::Sender<Notification>,
}

impl RedisNotifier {
    /// Spawn the publish worker. Must be called inside a tokio runtime.
    pub fn spawn(publisher: Publisher, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(run_worker(publisher, receiver));
        Self { sender }
    }
}

impl Notifier for RedisNotifier {
    fn publish(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(topic = dropped.topic.name(), "notifier queue full; dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(topic = dropped.topic.name(), "notifier queue closed; dropping message");
            }
        }
    }
}

async fn run_worker(mut publisher: Publisher, mut receiver: mpsc::Receiver<Notification>) {
    info!(channel = publisher.channel(), "notification worker started");
    while let Some(message) = receiver.recv().await {
        match publisher.publish_message(&message).await {
            Ok(subscribers) => debug!(
                topic = message.topic.name(),
                token = %format!("{:#x}", message.record.address),
                subscribers,
                "published"
            ),
            Err(err) => warn!(topic = message.topic.name(), %err, "publish failed"),
        }
    }
}

/// [`Notifier`] that only logs; used with the in-memory backend
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, notification: Notification) {
        info!(
            topic = notification.topic.name(),
            token = %format!("{:#x}", notification.record.address),
            "event"
        );
    }
}
