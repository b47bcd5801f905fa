use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use tracing::{error, info};

use crate::errors::ServiceError;
use crate::events::Event;
use crate::message_queue::{topics, Message};
use crate::services::AdjustBy;

use super::{
    parse_payload, ConsumerContext, MessageConsumer, ProductCardRecalculateMessage,
    ReleaseUnitMessage,
};

pub const DEDUP_NAMESPACE: &str = "ledger.release_unit";

lazy_static! {
    static ref RELEASES_TOTAL: IntCounter = IntCounter::new(
        "stockroom_releases_total",
        "Total number of released reservation units"
    )
    .expect("metric can be created");
}

/// Releases a reservation on the bin picked by the `by_reserve_max` policy:
/// the largest-stock bin first, so small bins are not drained to zero.
pub struct ReleaseUnitConsumer;

#[async_trait]
impl MessageConsumer for ReleaseUnitConsumer {
    fn topic(&self) -> &'static str {
        topics::RELEASE_UNIT
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError> {
        let msg: ReleaseUnitMessage = parse_payload(message)?;

        let mut parts = vec![msg.request_id.to_string()];
        parts.extend(msg.key.dedup_parts());
        parts.push(msg.iterate.to_string());
        let mut handle = ctx.deduplicator.deduplicate(DEDUP_NAMESPACE, &parts).await?;
        if handle.is_executed() {
            info!(
                request_id = %msg.request_id,
                iterate = msg.iterate,
                "duplicate release message, skipping"
            );
            return Ok(());
        }

        let candidate = ctx
            .selector
            .by_reserve_max(msg.warehouse_id, &msg.key)
            .await?;
        let Some(row) = candidate else {
            error!(
                request_id = %msg.request_id,
                warehouse_id = %msg.warehouse_id,
                product_id = %msg.key.product_id,
                quantity = msg.quantity,
                "no reserve-holding ledger row to release"
            );
            return Err(ServiceError::NoCandidate(format!(
                "no reserved stock for product {} in warehouse {}",
                msg.key.product_id, msg.warehouse_id
            )));
        };

        ctx.adjuster
            .sub(row.id, AdjustBy::reserve(msg.quantity))
            .await?;
        RELEASES_TOTAL.inc();

        ctx.notify(Event::LedgerAdjusted {
            location_id: row.id,
            warehouse_id: msg.warehouse_id,
            product_id: msg.key.product_id,
            total_delta: 0,
            reserve_delta: -msg.quantity,
        })
        .await;
        ctx.publish(
            topics::PRODUCT_CARD_RECALCULATE,
            &ProductCardRecalculateMessage {
                warehouse_id: msg.warehouse_id,
                key: msg.key.clone(),
            },
        )
        .await?;

        handle.save().await
    }
}
