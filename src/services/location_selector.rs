use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::stock_location::{
    self, variant_condition, Entity as StockLocation, VariantKey,
};
use crate::errors::ServiceError;

/// Read-only queries that pick the ledger row satisfying a selection policy.
///
/// Every policy is scoped to an exact (warehouse, variant) match and returns
/// at most one row. A `None` result means "cannot satisfy"; callers must fail
/// loudly rather than silently skip. Selection is only a hint; the gated
/// update in the adjuster is what actually protects the invariant, so a
/// candidate can go stale between selection and mutation.
#[derive(Clone)]
pub struct LocationSelector {
    db: Arc<DatabaseConnection>,
}

impl LocationSelector {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Smallest bin that has both stock and reservations. Diagnostic use.
    #[instrument(skip(self, key), fields(product_id = %key.product_id))]
    pub async fn by_total_min(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<Option<stock_location::Model>, ServiceError> {
        StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .filter(stock_location::Column::Total.gt(0))
            .filter(stock_location::Column::Reserve.gt(0))
            .order_by_asc(stock_location::Column::Total)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Largest bin with any stock. Suggests a placement for incoming stock.
    #[instrument(skip(self, key), fields(product_id = %key.product_id))]
    pub async fn by_total_max(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<Option<stock_location::Model>, ServiceError> {
        StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .filter(stock_location::Column::Total.gt(0))
            .order_by_desc(stock_location::Column::Total)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Largest-stock bin among those holding a reservation. Used when
    /// releasing, so small bins are not drained to zero first.
    #[instrument(skip(self, key), fields(product_id = %key.product_id))]
    pub async fn by_reserve_max(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<Option<stock_location::Model>, ServiceError> {
        StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .filter(stock_location::Column::Reserve.gt(0))
            .order_by_desc(stock_location::Column::Total)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Bin for a new reservation: explicitly prioritized bins first, then the
    /// smallest bin with free capacity. The smallest-sufficient tie-break
    /// keeps large bins intact for future bulk orders.
    #[instrument(skip(self, key), fields(product_id = %key.product_id))]
    pub async fn by_sub_reserve(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<Option<stock_location::Model>, ServiceError> {
        StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .filter(
                Expr::expr(
                    Expr::col(stock_location::Column::Total)
                        .sub(Expr::col(stock_location::Column::Reserve)),
                )
                .gt(0),
            )
            .order_by_desc(stock_location::Column::Priority)
            .order_by_asc(stock_location::Column::Total)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Exact placement lookup: variant plus a specific storage bin.
    #[instrument(skip(self, key), fields(product_id = %key.product_id))]
    pub async fn find_placement(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
        storage: Option<&str>,
    ) -> Result<Option<stock_location::Model>, ServiceError> {
        let mut query = StockLocation::find().filter(variant_condition(warehouse_id, key));
        query = match storage {
            Some(label) => query.filter(stock_location::Column::Storage.eq(label)),
            None => query.filter(stock_location::Column::Storage.is_null()),
        };
        query.one(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Every ledger row for the variant, for the threshold monitor.
    pub async fn all_for_variant(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<Vec<stock_location::Model>, ServiceError> {
        StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Number of physical bins holding the variant. A count of one lets the
    /// per-unit message fan-out collapse into a single quantity-carrying
    /// message, since there is nothing to disambiguate.
    pub async fn count_for_variant(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<u64, ServiceError> {
        StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .count(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}
