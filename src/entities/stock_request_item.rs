use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::stock_location::VariantKey;

/// One line of a stock request: a product variant, a quantity and an optional
/// target storage bin.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_request_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub product_id: Uuid,
    pub offer_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub modification_id: Option<Uuid>,
    pub quantity: i32,
    pub storage: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_request::Entity",
        from = "Column::RequestId",
        to = "super::stock_request::Column::Id"
    )]
    Request,
}

impl Related<super::stock_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn variant_key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id,
            offer_id: self.offer_id,
            variation_id: self.variation_id,
            modification_id: self.modification_id,
        }
    }
}
