use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{ActiveModelTrait, Set};
use tracing::info;
use uuid::Uuid;

use crate::entities::stock_location::{self, normalize_storage};
use crate::errors::ServiceError;
use crate::events::Event;
use crate::message_queue::{topics, Message};
use crate::services::AdjustBy;

use super::{
    parse_payload, ConsumerContext, IncomingStockMessage, MessageConsumer,
    ProductCardRecalculateMessage,
};

pub const DEDUP_NAMESPACE: &str = "ledger.incoming_stock";

lazy_static! {
    static ref INTAKES_TOTAL: IntCounter = IntCounter::new(
        "stockroom_intakes_total",
        "Total number of processed stock intake messages"
    )
    .expect("metric can be created");
}

/// Books received stock into the ledger.
///
/// With an explicit bin label the intake lands on that exact placement,
/// creating the row if needed. Without one it tops up the largest existing
/// bin, falling back to a fresh unlabelled row for a variant the warehouse
/// has never held.
pub struct IncomingStockConsumer;

#[async_trait]
impl MessageConsumer for IncomingStockConsumer {
    fn topic(&self) -> &'static str {
        topics::INCOMING_STOCK
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError> {
        let msg: IncomingStockMessage = parse_payload(message)?;

        let mut parts = vec![msg.warehouse_id.to_string()];
        parts.extend(msg.key.dedup_parts());
        parts.push(msg.reference.clone());
        let mut handle = ctx.deduplicator.deduplicate(DEDUP_NAMESPACE, &parts).await?;
        if handle.is_executed() {
            info!(
                warehouse_id = %msg.warehouse_id,
                reference = %msg.reference,
                "duplicate incoming-stock message, skipping"
            );
            return Ok(());
        }

        let key = ctx.resolver.resolve(&msg.key).await?;
        let storage = normalize_storage(msg.storage.as_deref());

        let existing = match storage.as_deref() {
            Some(label) => {
                ctx.selector
                    .find_placement(msg.warehouse_id, &key, Some(label))
                    .await?
            }
            None => ctx.selector.by_total_max(msg.warehouse_id, &key).await?,
        };

        let location_id = match existing {
            Some(row) => {
                ctx.adjuster
                    .add(row.id, AdjustBy::total(msg.quantity))
                    .await?;
                row.id
            }
            None => {
                let row = stock_location::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    warehouse_id: Set(msg.warehouse_id),
                    user_id: Set(msg.acting_user),
                    product_id: Set(key.product_id),
                    offer_id: Set(key.offer_id),
                    variation_id: Set(key.variation_id),
                    modification_id: Set(key.modification_id),
                    storage: Set(storage.clone()),
                    total: Set(msg.quantity),
                    reserve: Set(0),
                    priority: Set(0),
                    approve: Set(true),
                    comment: Set(None),
                    price: Set(msg.price),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                };
                let row = row.insert(&*ctx.db).await.map_err(ServiceError::db_error)?;
                info!(
                    location_id = %row.id,
                    warehouse_id = %msg.warehouse_id,
                    product_id = %key.product_id,
                    storage = ?storage,
                    "created ledger row for first intake of variant"
                );
                row.id
            }
        };
        INTAKES_TOTAL.inc();

        ctx.notify(Event::LedgerAdjusted {
            location_id,
            warehouse_id: msg.warehouse_id,
            product_id: key.product_id,
            total_delta: msg.quantity,
            reserve_delta: 0,
        })
        .await;
        ctx.publish(
            topics::PRODUCT_CARD_RECALCULATE,
            &ProductCardRecalculateMessage {
                warehouse_id: msg.warehouse_id,
                key,
            },
        )
        .await?;

        handle.save().await
    }
}
