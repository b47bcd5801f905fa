use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::entities::stock_request::RequestStatus;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::message_queue::{topics, Message};

use super::{
    debit_variant, parse_payload, ConsumerContext, MessageConsumer, ProductCardRecalculateMessage,
    RequestStatusChangedMessage,
};

pub const DEDUP_NAMESPACE: &str = "request.status";

/// Advances a stock request through its lifecycle.
///
/// A request found in a state the transition table does not allow is a
/// data-consistency anomaly, not a transient fault: the message is logged and
/// dropped rather than nacked, since redelivery cannot repair it.
///
/// Completion is where reserved stock physically leaves the warehouse: every
/// item is debited total and reserve together, then the affected variants are
/// re-checked against the approval threshold.
pub struct RequestStatusChangedConsumer;

#[async_trait]
impl MessageConsumer for RequestStatusChangedConsumer {
    fn topic(&self) -> &'static str {
        topics::REQUEST_STATUS_CHANGED
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError> {
        let msg: RequestStatusChangedMessage = parse_payload(message)?;

        let request = ctx.requests.load(msg.request_id).await?;
        let from = request.request_status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "stock request {} carries unknown status {}",
                msg.request_id, request.status
            ))
        })?;

        // The key carries the source status: the transition table legally
        // revisits statuses (Moving returns to Incoming, Divide to Warehouse),
        // so (request, target) alone would suppress the second advancement.
        let parts = vec![
            msg.request_id.to_string(),
            from.to_string(),
            msg.to_status.to_string(),
        ];
        let mut handle = ctx.deduplicator.deduplicate(DEDUP_NAMESPACE, &parts).await?;
        if handle.is_executed() {
            info!(
                request_id = %msg.request_id,
                from = %from,
                to = %msg.to_status,
                "duplicate status-change message, skipping"
            );
            return Ok(());
        }

        if !from.can_transition(msg.to_status) {
            error!(
                request_id = %msg.request_id,
                from = %from,
                to = %msg.to_status,
                acting_user = %msg.acting_user,
                "request not in expected status, dropping status-change message"
            );
            return Ok(());
        }

        let (updated, items) = if msg.to_status == RequestStatus::Completed {
            let (_, items) = ctx.requests.load_with_items(msg.request_id).await?;
            for item in &items {
                debit_variant(ctx, request.warehouse_id, &item.variant_key(), item.quantity)
                    .await?;
            }
            let updated = ctx
                .requests
                .advance(msg.request_id, msg.to_status, msg.acting_user)
                .await?;
            (updated, items)
        } else {
            let updated = ctx
                .requests
                .advance(msg.request_id, msg.to_status, msg.acting_user)
                .await?;
            (updated, Vec::new())
        };

        ctx.notify(Event::RequestAdvanced {
            request_id: updated.id,
            from,
            to: msg.to_status,
        })
        .await;
        if msg.to_status.is_terminal() {
            ctx.notify(Event::RequestRemoved(updated.id)).await;
        }

        for item in &items {
            let key = item.variant_key();
            // Threshold re-check is best effort; a failed check never undoes
            // the completed debit.
            match ctx.monitor.check_variant(request.warehouse_id, &key).await {
                Ok(flagged) => {
                    for location_id in flagged {
                        ctx.notify(Event::RecountFlagged {
                            location_id,
                            warehouse_id: request.warehouse_id,
                            product_id: key.product_id,
                        })
                        .await;
                    }
                }
                Err(e) => {
                    warn!(
                        request_id = %msg.request_id,
                        product_id = %key.product_id,
                        error = %e,
                        "approval threshold check failed after completion"
                    );
                }
            }

            ctx.publish(
                topics::PRODUCT_CARD_RECALCULATE,
                &ProductCardRecalculateMessage {
                    warehouse_id: request.warehouse_id,
                    key,
                },
            )
            .await?;
        }

        handle.save().await
    }
}
