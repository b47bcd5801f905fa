use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::entities::stock_location::{self, Entity as StockLocation};
use crate::errors::ServiceError;

/// Quantity delta for one adjuster call. At least one field must be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustBy {
    pub total: Option<i32>,
    pub reserve: Option<i32>,
}

impl AdjustBy {
    pub fn total(n: i32) -> Self {
        Self {
            total: Some(n),
            reserve: None,
        }
    }

    pub fn reserve(n: i32) -> Self {
        Self {
            total: None,
            reserve: Some(n),
        }
    }

    pub fn both(total: i32, reserve: i32) -> Self {
        Self {
            total: Some(total),
            reserve: Some(reserve),
        }
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.total.is_none() && self.reserve.is_none() {
            return Err(ServiceError::InvalidOperation(
                "adjustment must touch total or reserve".to_string(),
            ));
        }
        if self.total.is_some_and(|n| n < 1) || self.reserve.is_some_and(|n| n < 1) {
            return Err(ServiceError::InvalidOperation(
                "adjustment quantities must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The only component allowed to mutate ledger quantities.
///
/// Every mutation is a single conditional `UPDATE ... WHERE` whose gate
/// re-checks the invariant at update time; the affected-row count is the
/// success signal. Zero affected rows means the candidate selected earlier is
/// stale, which is an error here, never a silent no-op. There are no row
/// locks anywhere; concurrent workers race on the gate and exactly one wins.
#[derive(Clone)]
pub struct AtomicAdjuster {
    db: Arc<DatabaseConnection>,
}

impl AtomicAdjuster {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Increments quantities on one row. The `total` increment is
    /// unconditional; a `reserve` increment is gated on
    /// `(total - reserve) >= n` inside the statement, which closes the race
    /// window between selection and mutation.
    #[instrument(skip(self))]
    pub async fn add(&self, id: Uuid, by: AdjustBy) -> Result<u64, ServiceError> {
        by.validate()?;

        let mut update = StockLocation::update_many()
            .filter(stock_location::Column::Id.eq(id))
            .col_expr(
                stock_location::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            );

        if let Some(n) = by.total {
            update = update.col_expr(
                stock_location::Column::Total,
                Expr::col(stock_location::Column::Total).add(n),
            );
        }
        if let Some(n) = by.reserve {
            update = update
                .col_expr(
                    stock_location::Column::Reserve,
                    Expr::col(stock_location::Column::Reserve).add(n),
                )
                .filter(
                    Expr::expr(
                        Expr::col(stock_location::Column::Total)
                            .sub(Expr::col(stock_location::Column::Reserve)),
                    )
                    .gte(n),
                );
        }

        let result = update.exec(&*self.db).await.map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            error!(
                location_id = %id,
                total_delta = ?by.total,
                reserve_delta = ?by.reserve,
                "conditional increment affected no rows"
            );
            return Err(ServiceError::StaleCandidate(format!(
                "increment affected no rows for location {}",
                id
            )));
        }
        Ok(result.rows_affected)
    }

    /// Decrements quantities on one row, gated on each touched field holding
    /// at least the decrement. If the row ends up at `total == 0 &&
    /// reserve == 0` it is deleted in the same operation, so empty bins never
    /// persist.
    #[instrument(skip(self))]
    pub async fn sub(&self, id: Uuid, by: AdjustBy) -> Result<u64, ServiceError> {
        by.validate()?;

        let mut update = StockLocation::update_many()
            .filter(stock_location::Column::Id.eq(id))
            .col_expr(
                stock_location::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            );

        if let Some(n) = by.total {
            update = update
                .col_expr(
                    stock_location::Column::Total,
                    Expr::col(stock_location::Column::Total).sub(n),
                )
                .filter(stock_location::Column::Total.gte(n));
        }
        if let Some(n) = by.reserve {
            update = update
                .col_expr(
                    stock_location::Column::Reserve,
                    Expr::col(stock_location::Column::Reserve).sub(n),
                )
                .filter(stock_location::Column::Reserve.gte(n));
        }

        let result = update.exec(&*self.db).await.map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            error!(
                location_id = %id,
                total_delta = ?by.total,
                reserve_delta = ?by.reserve,
                "conditional decrement affected no rows, nothing to decrement"
            );
            return Err(ServiceError::StaleCandidate(format!(
                "decrement affected no rows for location {}",
                id
            )));
        }

        // Housekeeping: drop the row if it is now empty.
        let deleted = StockLocation::delete_many()
            .filter(stock_location::Column::Id.eq(id))
            .filter(stock_location::Column::Total.eq(0))
            .filter(stock_location::Column::Reserve.eq(0))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if deleted.rows_affected > 0 {
            debug!(location_id = %id, "removed empty ledger row");
        }

        Ok(result.rows_affected)
    }
}
