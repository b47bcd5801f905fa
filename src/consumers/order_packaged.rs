use async_trait::async_trait;
use futures::future::join_all;
use tracing::{error, info};

use crate::errors::ServiceError;
use crate::events::Event;
use crate::message_queue::{topics, Message};
use crate::resolvers::{OrderLine, VariantResolver};
use crate::services::stock_requests::{CreatePackageInput, NewRequestItem};

use super::{
    parse_payload, ConsumerContext, MessageConsumer, OrderPackagedMessage, ReserveUnitMessage,
};

pub const DEDUP_NAMESPACE: &str = "request.package_from_order";

/// Creates a `Package` stock request when an order is placed, then fans out
/// one reserve message per physical unit.
///
/// Reservation is deliberately not done in bulk here: per-unit messages mean
/// a partial failure leaves a clearly identifiable partially-reserved request
/// instead of an all-or-nothing lock. When only one bin holds the variant the
/// fan-out collapses into a single quantity-carrying message, since there is
/// nothing to disambiguate.
pub struct OrderPackagedConsumer;

/// Re-resolves each order line to its current canonical variant identity.
/// Catalog entries can be re-versioned between order placement and packaging.
pub(crate) async fn resolve_lines(
    resolver: &dyn VariantResolver,
    lines: &[OrderLine],
) -> Result<Vec<NewRequestItem>, ServiceError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let key = resolver.resolve(&line.key).await?;
        items.push(NewRequestItem {
            key,
            quantity: line.quantity,
            storage: line.storage.clone(),
        });
    }
    Ok(items)
}

#[async_trait]
impl MessageConsumer for OrderPackagedConsumer {
    fn topic(&self) -> &'static str {
        topics::ORDER_PACKAGED
    }

    async fn consume(&self, ctx: &ConsumerContext, message: &Message) -> Result<(), ServiceError> {
        let msg: OrderPackagedMessage = parse_payload(message)?;

        let mut handle = ctx
            .deduplicator
            .deduplicate(DEDUP_NAMESPACE, &[msg.order_id.to_string()])
            .await?;
        if handle.is_executed() {
            info!(order_id = %msg.order_id, "duplicate order-packaged message, skipping");
            return Ok(());
        }

        let snapshot = ctx
            .orders
            .current_snapshot(msg.order_id)
            .await?
            .ok_or_else(|| {
                error!(order_id = %msg.order_id, "order snapshot missing for packaging");
                ServiceError::NotFound(format!("order {} not found", msg.order_id))
            })?;

        let items = resolve_lines(ctx.resolver.as_ref(), &snapshot.lines).await?;
        let (request, items) = ctx
            .requests
            .create_package(CreatePackageInput {
                order_id: msg.order_id,
                warehouse_id: snapshot.warehouse_id,
                responsible_id: msg.acting_user,
                items,
                comment: None,
            })
            .await?;

        ctx.notify(Event::RequestCreated {
            request_id: request.id,
            number: request.number.clone(),
            status: crate::entities::stock_request::RequestStatus::Package,
        })
        .await;
        ctx.notify(Event::RequestHidden(request.id)).await;

        for item in &items {
            let key = item.variant_key();
            let bins = ctx
                .selector
                .count_for_variant(request.warehouse_id, &key)
                .await?;

            if bins <= 1 {
                // Single bin: one message carrying the whole quantity.
                ctx.publish(
                    topics::RESERVE_UNIT,
                    &ReserveUnitMessage {
                        request_id: request.id,
                        warehouse_id: request.warehouse_id,
                        key,
                        quantity: item.quantity,
                        iterate: 0,
                        acting_user: msg.acting_user,
                    },
                )
                .await?;
            } else {
                let unit_messages: Vec<ReserveUnitMessage> = (0..item.quantity)
                    .map(|iterate| ReserveUnitMessage {
                        request_id: request.id,
                        warehouse_id: request.warehouse_id,
                        key: key.clone(),
                        quantity: 1,
                        iterate: iterate as u32,
                        acting_user: msg.acting_user,
                    })
                    .collect();
                let publishes = unit_messages
                    .iter()
                    .map(|unit| ctx.publish(topics::RESERVE_UNIT, unit));
                for result in join_all(publishes).await {
                    result?;
                }
            }
        }

        handle.save().await
    }
}
