use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stock-request aggregate header. Holds the current state only; the audit
/// trail is the structured log stream, not an event table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique human-readable number, e.g. `PKG-4F2A91C0`.
    pub number: String,
    pub status: String,
    pub warehouse_id: Uuid,
    pub responsible_id: Uuid,
    /// Linked order, present for packaging and decommission requests.
    pub order_id: Option<Uuid>,
    /// Destination profile for inter-warehouse transfers.
    pub move_to_warehouse_id: Option<Uuid>,
    pub move_order_id: Option<Uuid>,
    pub comment: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_request_item::Entity")]
    Items,
}

impl Related<super::stock_request_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn request_status(&self) -> Option<RequestStatus> {
        RequestStatus::from_str(&self.status).ok()
    }
}

/// The closed set of stock-request states.
///
/// Forward path: `Purchase → Incoming → Warehouse → Package → Extradition →
/// Completed`, with `Moving`, `Divide` and `Decommission` as side branches.
/// There is no abort-in-place: cancellation is expressed as a compensating
/// transition into `Decommission`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Purchase,
    Incoming,
    Warehouse,
    Package,
    Moving,
    Divide,
    Extradition,
    Completed,
    Decommission,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Decommission)
    }

    /// Explicit transition table. Anything not listed here is illegal and is
    /// treated by the handlers as a data-consistency anomaly.
    pub fn can_transition(self, to: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, to),
            (Purchase, Incoming)
                | (Incoming, Warehouse)
                | (Warehouse, Package)
                | (Package, Extradition)
                | (Extradition, Completed)
                | (Warehouse, Moving)
                | (Moving, Incoming)
                | (Warehouse, Divide)
                | (Divide, Warehouse)
                | (Warehouse, Decommission)
                | (Package, Decommission)
                | (Extradition, Decommission)
        )
    }
}
