use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts};
use tracing::{error, info};

use crate::errors::ServiceError;
use crate::events::Event;
use crate::message_queue::{topics, Message};
use crate::services::AdjustBy;

use super::{
    parse_payload, ConsumerContext, MessageConsumer, ProductCardRecalculateMessage,
    ReserveUnitMessage,
};

pub const DEDUP_NAMESPACE: &str = "ledger.reserve_unit";

lazy_static! {
    static ref RESERVATIONS_TOTAL: IntCounter = IntCounter::new(
        "stockroom_reservations_total",
        "Total number of reserved units"
    )
    .expect("metric can be created");
    static ref RESERVATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stockroom_reservation_failures_total",
            "Total number of failed unit reservations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

/// Reserves units on the bin picked by the `by_sub_reserve` policy.
///
/// A lost race (zero affected rows) or a missing candidate fails the unit;
/// there is no compensating transaction here; the caller decides whether to
/// retry with a fresh message or escalate.
pub struct ReserveUnitConsumer;

#[async_trait]
impl MessageConsumer for ReserveUnitConsumer {
    fn topic(&self) -> &'static str {
        topics::RESERVE_UNIT
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError> {
        let msg: ReserveUnitMessage = parse_payload(message)?;

        let mut parts = vec![msg.request_id.to_string()];
        parts.extend(msg.key.dedup_parts());
        parts.push(msg.iterate.to_string());
        let mut handle = ctx.deduplicator.deduplicate(DEDUP_NAMESPACE, &parts).await?;
        if handle.is_executed() {
            info!(
                request_id = %msg.request_id,
                iterate = msg.iterate,
                "duplicate reserve message, skipping"
            );
            return Ok(());
        }

        let candidate = ctx
            .selector
            .by_sub_reserve(msg.warehouse_id, &msg.key)
            .await?;
        let Some(row) = candidate else {
            RESERVATION_FAILURES
                .with_label_values(&["no_candidate"])
                .inc();
            error!(
                request_id = %msg.request_id,
                warehouse_id = %msg.warehouse_id,
                product_id = %msg.key.product_id,
                quantity = msg.quantity,
                "no ledger row can satisfy reservation"
            );
            return Err(ServiceError::NoCandidate(format!(
                "no ledger row for product {} in warehouse {}",
                msg.key.product_id, msg.warehouse_id
            )));
        };

        if let Err(e) = ctx.adjuster.add(row.id, AdjustBy::reserve(msg.quantity)).await {
            if matches!(e, ServiceError::StaleCandidate(_)) {
                RESERVATION_FAILURES
                    .with_label_values(&["stale_candidate"])
                    .inc();
            }
            return Err(e);
        }
        RESERVATIONS_TOTAL.inc();

        ctx.notify(Event::LedgerAdjusted {
            location_id: row.id,
            warehouse_id: msg.warehouse_id,
            product_id: msg.key.product_id,
            total_delta: 0,
            reserve_delta: msg.quantity,
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
