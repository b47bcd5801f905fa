use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::entities::stock_location::{normalize_storage, VariantKey};
use crate::entities::stock_request::{self, Entity as StockRequest, RequestStatus};
use crate::entities::stock_request_item::{self, Entity as StockRequestItem};
use crate::errors::ServiceError;

/// One line of a request being created.
#[derive(Debug, Clone)]
pub struct NewRequestItem {
    pub key: VariantKey,
    pub quantity: i32,
    pub storage: Option<String>,
}

/// Input for creating a packaging request from an order.
#[derive(Debug, Clone)]
pub struct CreatePackageInput {
    pub order_id: Uuid,
    pub warehouse_id: Uuid,
    pub responsible_id: Uuid,
    pub items: Vec<NewRequestItem>,
    pub comment: Option<String>,
}

/// The stock-request aggregate: creation and status transitions.
///
/// Transitions validate against the closed table on `RequestStatus`; a
/// request found in an unexpected state is a data-consistency anomaly, logged
/// critical and surfaced as `InvalidStatus` without mutation.
#[derive(Clone)]
pub struct StockRequestService {
    db: Arc<DatabaseConnection>,
}

impl StockRequestService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn next_number(prefix: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", prefix, suffix[..8].to_uppercase())
    }

    /// Creates a `Package` request for an order. No ledger mutation happens
    /// here: reservation is per-unit and asynchronous, so a partial failure
    /// leaves an identifiable partially-reserved request instead of an
    /// all-or-nothing lock.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn create_package(
        &self,
        input: CreatePackageInput,
    ) -> Result<(stock_request::Model, Vec<stock_request_item::Model>), ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "stock request requires at least one item".to_string(),
            ));
        }
        if input.items.iter().any(|item| item.quantity < 1) {
            return Err(ServiceError::ValidationError(
                "stock request item quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let request = stock_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            number: Set(Self::next_number("PKG")),
            status: Set(RequestStatus::Package.to_string()),
            warehouse_id: Set(input.warehouse_id),
            responsible_id: Set(input.responsible_id),
            order_id: Set(Some(input.order_id)),
            move_to_warehouse_id: Set(None),
            move_order_id: Set(None),
            comment: Set(input.comment),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let request = request.insert(&txn).await.map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = stock_request_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request.id),
                product_id: Set(line.key.product_id),
                offer_id: Set(line.key.offer_id),
                variation_id: Set(line.key.variation_id),
                modification_id: Set(line.key.modification_id),
                quantity: Set(line.quantity),
                storage: Set(normalize_storage(line.storage.as_deref())),
            };
            items.push(item.insert(&txn).await.map_err(ServiceError::db_error)?);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            request_id = %request.id,
            number = %request.number,
            order_id = %input.order_id,
            items = items.len(),
            "created packaging request"
        );
        Ok((request, items))
    }

    pub async fn load(&self, id: Uuid) -> Result<stock_request::Model, ServiceError> {
        StockRequest::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("stock request {} not found", id)))
    }

    pub async fn load_with_items(
        &self,
        id: Uuid,
    ) -> Result<(stock_request::Model, Vec<stock_request_item::Model>), ServiceError> {
        let request = self.load(id).await?;
        let items = StockRequestItem::find()
            .filter(stock_request_item::Column::RequestId.eq(id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((request, items))
    }

    pub async fn find_by_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<stock_request::Model>, ServiceError> {
        StockRequest::find()
            .filter(stock_request::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Moves a request to `to`, validating the transition inside the
    /// transaction so a concurrent advancement cannot slip between load and
    /// update.
    #[instrument(skip(self))]
    pub async fn advance(
        &self,
        id: Uuid,
        to: RequestStatus,
        acting_user: Uuid,
    ) -> Result<stock_request::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let request = StockRequest::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("stock request {} not found", id)))?;

        let from = request.request_status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "stock request {} carries unknown status {}",
                id, request.status
            ))
        })?;

        if !from.can_transition(to) {
            error!(
                request_id = %id,
                from = %from,
                to = %to,
                acting_user = %acting_user,
                "stock request not in expected status for transition"
            );
            return Err(ServiceError::InvalidStatus(format!(
                "cannot transition request {} from {} to {}",
                id, from, to
            )));
        }

        let mut active: stock_request::ActiveModel = request.into();
        active.status = Set(to.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            request_id = %id,
            from = %from,
            to = %to,
            acting_user = %acting_user,
            "stock request advanced"
        );
        Ok(updated)
    }
}
