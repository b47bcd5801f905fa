use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Idempotency record for at-least-once message delivery. One row per
/// committed (namespace, composite key); the unique index makes the first
/// committer win. Records persist indefinitely.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "handled_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub namespace: String,
    pub dedup_key: String,
    pub executed: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
