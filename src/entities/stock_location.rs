use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Condition;
use serde::{Deserialize, Serialize};

/// One ledger row: the total and reserved quantity of one product variant in
/// one storage bin of one warehouse.
///
/// Quantity fields are only ever mutated through the atomic adjuster; a row
/// whose total and reserve both reach zero is deleted, so empty bins never
/// persist.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub offer_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub modification_id: Option<Uuid>,
    /// Bin label, normalized lower-case. `None` means "no explicit bin".
    pub storage: Option<String>,
    pub total: i32,
    pub reserve: i32,
    pub priority: i32,
    /// Manual-recount flag; `false` means the bin needs a recount.
    pub approve: bool,
    pub comment: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub price: Option<Decimal>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Units not yet earmarked for a stock request.
    pub fn available(&self) -> i32 {
        self.total - self.reserve
    }

    pub fn variant_key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id,
            offer_id: self.offer_id,
            variation_id: self.variation_id,
            modification_id: self.modification_id,
        }
    }
}

/// The identity of a sellable configuration: product plus the optional
/// offer/variation/modification discriminators. An absent discriminator is
/// `None` and is matched with `IS NULL`; there is no wildcard matching.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub product_id: Uuid,
    pub offer_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub modification_id: Option<Uuid>,
}

impl VariantKey {
    pub fn of_product(product_id: Uuid) -> Self {
        Self {
            product_id,
            offer_id: None,
            variation_id: None,
            modification_id: None,
        }
    }

    /// Canonical string parts for deduplication keys.
    pub fn dedup_parts(&self) -> Vec<String> {
        fn part(id: Option<Uuid>) -> String {
            id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }
        vec![
            self.product_id.to_string(),
            part(self.offer_id),
            part(self.variation_id),
            part(self.modification_id),
        ]
    }
}

/// Exact-match condition over (warehouse, variant), with `IS NULL` for absent
/// discriminators. Shared by the selector and the threshold monitor.
pub fn variant_condition(warehouse_id: Uuid, key: &VariantKey) -> Condition {
    let mut cond = Condition::all()
        .add(Column::WarehouseId.eq(warehouse_id))
        .add(Column::ProductId.eq(key.product_id));
    cond = match key.offer_id {
        Some(id) => cond.add(Column::OfferId.eq(id)),
        None => cond.add(Column::OfferId.is_null()),
    };
    cond = match key.variation_id {
        Some(id) => cond.add(Column::VariationId.eq(id)),
        None => cond.add(Column::VariationId.is_null()),
    };
    match key.modification_id {
        Some(id) => cond.add(Column::ModificationId.eq(id)),
        None => cond.add(Column::ModificationId.is_null()),
    }
}

/// Bin labels are free text from the admin UI; they are compared exactly, so
/// normalize to trimmed lower-case on every write path. Empty labels collapse
/// to "no explicit bin".
pub fn normalize_storage(label: Option<&str>) -> Option<String> {
    label
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}
