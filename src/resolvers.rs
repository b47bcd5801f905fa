//! Seams to the collaborators the engine reads from but never owns: the
//! catalog's variant-identity resolver and the order aggregate.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::stock_location::VariantKey;
use crate::errors::ServiceError;

/// One line of an order snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub key: VariantKey,
    pub quantity: i32,
    pub storage: Option<String>,
}

/// The current state of an order, as read from the order aggregate.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub id: Uuid,
    pub status: String,
    pub warehouse_id: Uuid,
    pub responsible_id: Uuid,
    pub lines: Vec<OrderLine>,
}

/// Resolves a variant identity to its current canonical form. Catalog items
/// can be re-versioned after a request was created, so every message carries
/// resolved identities, never catalog-event-relative ones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VariantResolver: Send + Sync {
    async fn resolve(&self, key: &VariantKey) -> Result<VariantKey, ServiceError>;
}

/// Resolver for deployments where the catalog never re-identifies variants.
pub struct PassthroughVariantResolver;

#[async_trait]
impl VariantResolver for PassthroughVariantResolver {
    async fn resolve(&self, key: &VariantKey) -> Result<VariantKey, ServiceError> {
        Ok(key.clone())
    }
}

/// Read-only access to the order aggregate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn current_snapshot(&self, order_id: Uuid)
        -> Result<Option<OrderSnapshot>, ServiceError>;
}

/// In-process order store used by tests and the standalone worker.
#[derive(Default)]
pub struct InMemoryOrderGateway {
    orders: DashMap<Uuid, OrderSnapshot>,
}

impl InMemoryOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, snapshot: OrderSnapshot) {
        self.orders.insert(snapshot.id, snapshot);
    }
}

#[async_trait]
impl OrderGateway for InMemoryOrderGateway {
    async fn current_snapshot(
        &self,
        order_id: Uuid,
    ) -> Result<Option<OrderSnapshot>, ServiceError> {
        Ok(self.orders.get(&order_id).map(|entry| entry.clone()))
    }
}
