use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::entities::stock_request::RequestStatus;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::message_queue::{topics, Message};

use super::{
    debit_variant, parse_payload, ConsumerContext, MessageConsumer, OrderDecommissionedMessage,
    ProductCardRecalculateMessage,
};

pub const DEDUP_NAMESPACE: &str = "request.decommission_from_order";

/// Writes off the stock request tied to a decommissioned order.
///
/// The units are already reserved, so the write-off debits total and reserve
/// together and lands the request in the terminal `Decommission` status. A
/// request whose current status does not allow decommissioning is logged and
/// the message dropped; redelivery cannot repair a state mismatch.
pub struct OrderDecommissionedConsumer;

#[async_trait]
impl MessageConsumer for OrderDecommissionedConsumer {
    fn topic(&self) -> &'static str {
        topics::ORDER_DECOMMISSIONED
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError> {
        let msg: OrderDecommissionedMessage = parse_payload(message)?;

        let mut handle = ctx
            .deduplicator
            .deduplicate(DEDUP_NAMESPACE, &[msg.order_id.to_string()])
            .await?;
        if handle.is_executed() {
            info!(order_id = %msg.order_id, "duplicate order-decommissioned message, skipping");
            return Ok(());
        }

        let Some(request) = ctx.requests.find_by_order(msg.order_id).await? else {
            warn!(
                order_id = %msg.order_id,
                "no stock request for decommissioned order, nothing to write off"
            );
            handle.save().await?;
            return Ok(());
        };

        let from = request.request_status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "stock request {} carries unknown status {}",
                request.id, request.status
            ))
        })?;
        if !from.can_transition(RequestStatus::Decommission) {
            error!(
                order_id = %msg.order_id,
                request_id = %request.id,
                from = %from,
                "request not in a decommissionable status, dropping message"
            );
            return Ok(());
        }

        let (_, items) = ctx.requests.load_with_items(request.id).await?;
        for item in &items {
            debit_variant(ctx, request.warehouse_id, &item.variant_key(), item.quantity).await?;
        }

        ctx.requests
            .advance(request.id, RequestStatus::Decommission, msg.acting_user)
            .await?;

        ctx.notify(Event::RequestAdvanced {
            request_id: request.id,
            from,
            to: RequestStatus::Decommission,
        })
        .await;
        ctx.notify(Event::RequestRemoved(request.id)).await;

        for item in &items {
            ctx.publish(
                topics::PRODUCT_CARD_RECALCULATE,
                &ProductCardRecalculateMessage {
                    warehouse_id: request.warehouse_id,
                    key: item.variant_key(),
                },
            )
            .await?;
        }

        handle.save().await
    }
}
