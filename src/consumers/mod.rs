//! Message consumers: one handler per inbound domain message.
//!
//! Every consumer follows the same discipline: deduplicate first, mutate
//! through the selector/adjuster/state-machine services, commit the
//! deduplication key last, after all mutations and only when all validations
//! passed. Handlers registered for the same topic run in descending priority
//! order.

pub mod incoming_stock;
pub mod order_decommissioned;
pub mod order_packaged;
pub mod release_unit;
pub mod request_status_changed;
pub mod reserve_unit;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::entities::stock_location::VariantKey;
use crate::entities::stock_request::RequestStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::message_queue::{Message, MessageQueue};
use crate::resolvers::{OrderGateway, VariantResolver};
use crate::services::{
    ApprovalThresholdMonitor, AtomicAdjuster, AdjustBy, Deduplicator, LocationSelector,
    StockRequestService,
};

pub use incoming_stock::IncomingStockConsumer;
pub use order_decommissioned::OrderDecommissionedConsumer;
pub use order_packaged::OrderPackagedConsumer;
pub use release_unit::ReleaseUnitConsumer;
pub use request_status_changed::RequestStatusChangedConsumer;
pub use reserve_unit::ReserveUnitConsumer;

/// Everything a consumer needs: the services, the collaborator seams, the
/// outbound queue and the notification channel.
pub struct ConsumerContext {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub selector: LocationSelector,
    pub adjuster: AtomicAdjuster,
    pub deduplicator: Deduplicator,
    pub requests: StockRequestService,
    pub monitor: ApprovalThresholdMonitor,
    pub resolver: Arc<dyn VariantResolver>,
    pub orders: Arc<dyn OrderGateway>,
    pub queue: Arc<dyn MessageQueue>,
    pub events: EventSender,
}

impl ConsumerContext {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        resolver: Arc<dyn VariantResolver>,
        orders: Arc<dyn OrderGateway>,
        queue: Arc<dyn MessageQueue>,
        events: EventSender,
    ) -> Self {
        Self {
            selector: LocationSelector::new(db.clone()),
            adjuster: AtomicAdjuster::new(db.clone()),
            deduplicator: Deduplicator::new(db.clone()),
            requests: StockRequestService::new(db.clone()),
            monitor: ApprovalThresholdMonitor::new(db.clone(), config.approval.clone()),
            db,
            config,
            resolver,
            orders,
            queue,
            events,
        }
    }

    /// Publishes a follow-up domain message.
    pub(crate) async fn publish<T: Serialize>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<(), ServiceError> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| ServiceError::InternalError(format!("serialize {}: {}", topic, e)))?;
        self.queue
            .publish(Message::new(topic.to_string(), payload))
            .await
            .map_err(|e| ServiceError::QueueError(e.to_string()))
    }

    /// Fire-and-forget notification; delivery failure is logged, never fatal.
    pub(crate) async fn notify(&self, event: Event) {
        if let Err(e) = self.events.send(event).await {
            warn!(error = %e, "failed to deliver notification event");
        }
    }
}

/// Debits fulfilled stock: walks the reserve-holding bins largest first and
/// decrements total and reserve together. This is the only point where units
/// physically leave the warehouse; every earlier reserve step only held
/// capacity.
pub(crate) async fn debit_variant(
    ctx: &ConsumerContext,
    warehouse_id: Uuid,
    key: &VariantKey,
    quantity: i32,
) -> Result<(), ServiceError> {
    let mut remaining = quantity;
    while remaining > 0 {
        let row = ctx
            .selector
            .by_reserve_max(warehouse_id, key)
            .await?
            .ok_or_else(|| {
                error!(
                    warehouse_id = %warehouse_id,
                    product_id = %key.product_id,
                    remaining = remaining,
                    "no reserve-holding bin left while debiting fulfilled stock"
                );
                ServiceError::NoCandidate(format!(
                    "no reserve-holding bin for product {} in warehouse {}",
                    key.product_id, warehouse_id
                ))
            })?;

        let step = remaining.min(row.reserve);
        ctx.adjuster.sub(row.id, AdjustBy::both(step, step)).await?;
        ctx.notify(Event::LedgerAdjusted {
            location_id: row.id,
            warehouse_id,
            product_id: key.product_id,
            total_delta: -step,
            reserve_delta: -step,
        })
        .await;
        remaining -= step;
    }
    Ok(())
}

/// Inbound message payloads. Each carries the fully resolved variant identity
/// plus whatever discriminators its deduplication key needs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderPackagedMessage {
    pub order_id: Uuid,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReserveUnitMessage {
    pub request_id: Uuid,
    pub warehouse_id: Uuid,
    pub key: VariantKey,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Distinguishes otherwise-identical per-unit messages in the
    /// deduplication key. Imposes no ordering.
    pub iterate: u32,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReleaseUnitMessage {
    pub request_id: Uuid,
    pub warehouse_id: Uuid,
    pub key: VariantKey,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub iterate: u32,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestStatusChangedMessage {
    pub request_id: Uuid,
    pub to_status: RequestStatus,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderDecommissionedMessage {
    pub order_id: Uuid,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IncomingStockMessage {
    pub warehouse_id: Uuid,
    pub key: VariantKey,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub storage: Option<String>,
    pub price: Option<Decimal>,
    /// Intake document reference; part of the deduplication key.
    #[validate(length(min = 1))]
    pub reference: String,
    pub acting_user: Uuid,
}

/// Produced for the downstream product-card projection after any ledger
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCardRecalculateMessage {
    pub warehouse_id: Uuid,
    pub key: VariantKey,
}

pub(crate) fn parse_payload<T: serde::de::DeserializeOwned + Validate>(
    message: &Message,
) -> Result<T, ServiceError> {
    let parsed: T = serde_json::from_value(message.payload.clone()).map_err(|e| {
        ServiceError::ValidationError(format!("malformed {} payload: {}", message.topic, e))
    })?;
    parsed
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("invalid {} payload: {}", message.topic, e)))?;
    Ok(parsed)
}

/// A handler for one message topic.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    fn topic(&self) -> &'static str;

    /// Handlers for the same topic run in descending priority order.
    fn priority(&self) -> i32 {
        0
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError>;
}

/// Topic → ordered handlers.
#[derive(Default)]
pub struct ConsumerRegistry {
    handlers: HashMap<&'static str, Vec<Arc<dyn MessageConsumer>>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every consumer this crate ships.
    pub fn with_default_consumers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OrderPackagedConsumer));
        registry.register(Arc::new(OrderDecommissionedConsumer));
        registry.register(Arc::new(IncomingStockConsumer));
        registry.register(Arc::new(ReserveUnitConsumer));
        registry.register(Arc::new(ReleaseUnitConsumer));
        registry.register(Arc::new(RequestStatusChangedConsumer));
        registry
    }

    pub fn register(&mut self, consumer: Arc<dyn MessageConsumer>) {
        let handlers = self.handlers.entry(consumer.topic()).or_default();
        handlers.push(consumer);
        handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    pub fn topics(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Runs every handler registered for the message's topic, highest
    /// priority first. The first failing handler aborts the chain.
    pub async fn dispatch(
        &self,
        ctx: &ConsumerContext,
        message: &Message,
    ) -> Result<(), ServiceError> {
        let Some(handlers) = self.handlers.get(message.topic.as_str()) else {
            warn!(topic = %message.topic, "no consumer registered for topic");
            return Ok(());
        };
        for handler in handlers {
            handler.consume(ctx, message).await?;
        }
        Ok(())
    }
}

/// Drains the queue forever: one message per iteration per topic, nack on
/// failure so the queue's at-least-once redelivery applies.
pub async fn run_consumer_loop(
    ctx: Arc<ConsumerContext>,
    registry: Arc<ConsumerRegistry>,
) -> Result<(), ServiceError> {
    info!("consumer loop started");
    loop {
        let mut drained_any = false;
        for topic in registry.topics() {
            let message = ctx
                .queue
                .subscribe(topic)
                .await
                .map_err(|e| ServiceError::QueueError(e.to_string()))?;
            let Some(message) = message else { continue };
            drained_any = true;

            match registry.dispatch(&ctx, &message).await {
                Ok(()) => {
                    let _ = ctx.queue.ack(&message.id).await;
                }
                Err(e) => {
                    error!(
                        topic = %message.topic,
                        message_id = %message.id,
                        retry_count = message.retry_count,
                        error = %e,
                        "message handling failed"
                    );
                    ctx.queue
                        .nack(message)
                        .await
                        .map_err(|e| ServiceError::QueueError(e.to_string()))?;
                }
            }
        }
        if !drained_any {
            tokio::time::sleep(Duration::from_millis(ctx.config.queue_idle_poll_ms)).await;
        }
    }
}
