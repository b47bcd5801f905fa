use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ApprovalConfig;
use crate::entities::stock_location::{self, variant_condition, Entity as StockLocation, VariantKey};
use crate::errors::ServiceError;

/// Post-fulfillment check that flags bins for manual recount once their
/// available quantity drops below the per-warehouse threshold.
///
/// Best-effort by contract: a failure to flag one bin is logged and skipped,
/// and never fails the transition that triggered the check.
#[derive(Clone)]
pub struct ApprovalThresholdMonitor {
    db: Arc<DatabaseConnection>,
    approval: ApprovalConfig,
}

impl ApprovalThresholdMonitor {
    pub fn new(db: Arc<DatabaseConnection>, approval: ApprovalConfig) -> Self {
        Self { db, approval }
    }

    /// Flags every bin of the variant whose available quantity is below the
    /// warehouse threshold. Returns the flagged row ids. A threshold of zero
    /// disables the check entirely.
    #[instrument(skip(self, key), fields(product_id = %key.product_id))]
    pub async fn check_variant(
        &self,
        warehouse_id: Uuid,
        key: &VariantKey,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let threshold = self.approval.threshold_for(warehouse_id);
        if threshold <= 0 {
            return Ok(Vec::new());
        }

        let rows = StockLocation::find()
            .filter(variant_condition(warehouse_id, key))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut flagged = Vec::new();
        for row in rows {
            if row.available() >= threshold || !row.approve {
                continue;
            }
            let row_id = row.id;
            let available = row.available();
            let mut active: stock_location::ActiveModel = row.into();
            active.approve = Set(false);
            active.updated_at = Set(Some(Utc::now()));
            match active.update(&*self.db).await {
                Ok(_) => {
                    info!(
                        location_id = %row_id,
                        warehouse_id = %warehouse_id,
                        available = available,
                        threshold = threshold,
                        "flagged bin for manual recount"
                    );
                    flagged.push(row_id);
                }
                Err(e) => {
                    warn!(
                        location_id = %row_id,
                        warehouse_id = %warehouse_id,
                        error = %e,
                        "failed to flag bin for recount"
                    );
                }
            }
        }

        Ok(flagged)
    }
}
