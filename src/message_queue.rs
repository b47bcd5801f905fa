/*!
 * # Message Queue Implementation
 *
 * Transport for the engine's domain messages. Delivery is at-least-once: a
 * nacked message is requeued until its retry budget runs out, so every
 * consumer must deduplicate.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Topic names for the engine's domain messages.
pub mod topics {
    pub const ORDER_PACKAGED: &str = "stockroom.order.packaged";
    pub const ORDER_DECOMMISSIONED: &str = "stockroom.order.decommissioned";
    pub const INCOMING_STOCK: &str = "stockroom.stock.incoming";
    pub const RESERVE_UNIT: &str = "stockroom.ledger.reserve";
    pub const RELEASE_UNIT: &str = "stockroom.ledger.release";
    pub const REQUEST_STATUS_CHANGED: &str = "stockroom.request.status";
    /// Produced for downstream product-card projections; not consumed here.
    pub const PRODUCT_CARD_RECALCULATE: &str = "stockroom.product_card.recalculate";
}

/// Message queue errors
#[derive(Error, Debug)]
pub enum MessageQueueError {
    #[error("Queue is full")]
    QueueFull,
    #[error("Queue is empty")]
    QueueEmpty,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Message envelope for queue items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl Message {
    pub fn new(topic: String, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            payload,
            timestamp: chrono::Utc::now(),
            retry_count: 0,
            max_retries: 3,
        }
    }
}

/// Message queue trait for different implementations
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError>;
    async fn subscribe(&self, topic: &str) -> Result<Option<Message>, MessageQueueError>;
    async fn ack(&self, message_id: &Uuid) -> Result<(), MessageQueueError>;
    async fn nack(&self, message: Message) -> Result<(), MessageQueueError>;
}

/// In-memory message queue implementation
#[derive(Debug)]
pub struct InMemoryMessageQueue {
    queues: Arc<Mutex<HashMap<String, VecDeque<Message>>>>,
    max_size: usize,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_max_size(1000)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            max_size,
        }
    }

    pub fn depth(&self, topic: &str) -> usize {
        let queues = self.queues.lock().unwrap();
        queues.get(topic).map(VecDeque::len).unwrap_or(0)
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let mut queues = self.queues.lock().unwrap();
        let queue = queues
            .entry(message.topic.clone())
            .or_insert_with(VecDeque::new);

        if queue.len() >= self.max_size {
            return Err(MessageQueueError::QueueFull);
        }

        queue.push_back(message);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Option<Message>, MessageQueueError> {
        let mut queues = self.queues.lock().unwrap();
        if let Some(queue) = queues.get_mut(topic) {
            Ok(queue.pop_front())
        } else {
            Ok(None)
        }
    }

    async fn ack(&self, _message_id: &Uuid) -> Result<(), MessageQueueError> {
        // Popping on subscribe already removed the message
        Ok(())
    }

    async fn nack(&self, mut message: Message) -> Result<(), MessageQueueError> {
        message.retry_count += 1;
        if message.retry_count > message.max_retries {
            // Retry budget exhausted; the message is dropped after the
            // consumer has already logged the failure.
            return Ok(());
        }
        let mut queues = self.queues.lock().unwrap();
        let queue = queues
            .entry(message.topic.clone())
            .or_insert_with(VecDeque::new);
        queue.push_back(message);
        Ok(())
    }
}
