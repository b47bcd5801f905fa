use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::handled_message::{self, Entity as HandledMessage};
use crate::errors::ServiceError;

const KEY_SEPARATOR: &str = ":";

/// Cross-cutting idempotency guard for at-least-once message delivery.
///
/// Handlers check `is_executed()` as their first action and `save()` as their
/// last, after all mutations. This is not a lock: two concurrent deliveries
/// of the same key can both observe `is_executed() == false` before either
/// saves. The ledger-level conditional updates remain the true safety net;
/// deduplication only suppresses the common duplicate-delivery case.
#[derive(Clone)]
pub struct Deduplicator {
    db: Arc<DatabaseConnection>,
}

impl Deduplicator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn compose_key(parts: &[String]) -> String {
        parts.join(KEY_SEPARATOR)
    }

    #[instrument(skip(self, parts))]
    pub async fn deduplicate(
        &self,
        namespace: &str,
        parts: &[String],
    ) -> Result<DeduplicationHandle, ServiceError> {
        let dedup_key = Self::compose_key(parts);
        let existing = HandledMessage::find()
            .filter(handled_message::Column::Namespace.eq(namespace))
            .filter(handled_message::Column::DedupKey.eq(&dedup_key))
            .filter(handled_message::Column::Executed.eq(true))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DeduplicationHandle {
            db: self.db.clone(),
            namespace: namespace.to_string(),
            dedup_key,
            executed: existing.is_some(),
        })
    }
}

/// Outcome of a deduplication check, plus the means to commit it.
pub struct DeduplicationHandle {
    db: Arc<DatabaseConnection>,
    namespace: String,
    dedup_key: String,
    executed: bool,
}

impl DeduplicationHandle {
    /// True iff some worker already committed this key.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Commits the key. A unique-index violation means another worker
    /// committed first; that worker won and this call reports success.
    pub async fn save(&mut self) -> Result<(), ServiceError> {
        let record = handled_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            namespace: Set(self.namespace.clone()),
            dedup_key: Set(self.dedup_key.clone()),
            executed: Set(true),
            created_at: Set(Utc::now()),
        };

        match record.insert(&*self.db).await {
            Ok(_) => {
                self.executed = true;
                Ok(())
            }
            Err(insert_err) => {
                let committed = HandledMessage::find()
                    .filter(handled_message::Column::Namespace.eq(&self.namespace))
                    .filter(handled_message::Column::DedupKey.eq(&self.dedup_key))
                    .one(&*self.db)
                    .await
                    .map_err(ServiceError::db_error)?;
                if committed.is_some() {
                    info!(
                        namespace = %self.namespace,
                        dedup_key = %self.dedup_key,
                        "another worker committed this key first"
                    );
                    self.executed = true;
                    Ok(())
                } else {
                    Err(ServiceError::DatabaseError(insert_err))
                }
            }
        }
    }
}
