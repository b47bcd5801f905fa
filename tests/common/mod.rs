#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use stockroom::config::AppConfig;
use stockroom::consumers::ConsumerRegistry;
use stockroom::db;
use stockroom::entities::stock_location::{self, Entity as StockLocation, VariantKey};
use stockroom::entities::stock_request::{self, RequestStatus};
use stockroom::events::{Event, EventSender};
use stockroom::message_queue::{InMemoryMessageQueue, Message, MessageQueue};
use stockroom::resolvers::{InMemoryOrderGateway, PassthroughVariantResolver};
use stockroom::AppState;

/// Full engine wired against an in-memory SQLite database.
///
/// The pool is pinned to a single connection: every pooled connection to
/// `sqlite::memory:` would otherwise get its own private database.
pub struct TestApp {
    pub state: AppState,
    pub queue: Arc<InMemoryMessageQueue>,
    pub orders: Arc<InMemoryOrderGateway>,
    pub registry: ConsumerRegistry,
    pub events: mpsc::Receiver<Event>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(|_| {}).await
    }

    pub async fn spawn_with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        config.db_max_connections = 1;
        config.db_min_connections = 1;
        customize(&mut config);

        let conn = db::connect(&config).await.expect("connect to sqlite");
        db::run_migrations(&conn).await.expect("run migrations");

        let (event_tx, event_rx) = mpsc::channel(256);
        let queue = Arc::new(InMemoryMessageQueue::new());
        let orders = Arc::new(InMemoryOrderGateway::new());
        let state = AppState::new(
            Arc::new(conn),
            config,
            EventSender::new(event_tx),
            Arc::new(PassthroughVariantResolver),
            orders.clone(),
            queue.clone(),
        );

        Self {
            state,
            queue,
            orders,
            registry: ConsumerRegistry::with_default_consumers(),
            events: event_rx,
        }
    }

    pub async fn publish<T: serde::Serialize>(&self, topic: &str, payload: &T) {
        let payload = serde_json::to_value(payload).expect("serialize payload");
        self.queue
            .publish(Message::new(topic.to_string(), payload))
            .await
            .expect("publish message");
    }

    /// Dispatches queued messages until every topic is empty. Failed messages
    /// are nacked and retried until their retry budget runs out, exactly as
    /// the worker loop would.
    pub async fn drain(&self) {
        loop {
            let mut drained_any = false;
            for topic in self.registry.topics() {
                while let Some(message) =
                    self.queue.subscribe(topic).await.expect("subscribe")
                {
                    drained_any = true;
                    match self.registry.dispatch(&self.state.context, &message).await {
                        Ok(()) => {
                            let _ = self.queue.ack(&message.id).await;
                        }
                        Err(_) => {
                            self.queue.nack(message).await.expect("nack");
                        }
                    }
                }
            }
            if !drained_any {
                break;
            }
        }
    }

    pub async fn seed_location(&self, seed: LocationSeed) -> stock_location::Model {
        let row = stock_location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(seed.warehouse_id),
            user_id: Set(Uuid::new_v4()),
            product_id: Set(seed.key.product_id),
            offer_id: Set(seed.key.offer_id),
            variation_id: Set(seed.key.variation_id),
            modification_id: Set(seed.key.modification_id),
            storage: Set(seed.storage),
            total: Set(seed.total),
            reserve: Set(seed.reserve),
            priority: Set(seed.priority),
            approve: Set(true),
            comment: Set(None),
            price: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        row.insert(&*self.state.db).await.expect("seed ledger row")
    }

    /// Seeds a bare request header in the given status, for state-machine
    /// tests that do not go through order packaging.
    pub async fn seed_request(
        &self,
        warehouse_id: Uuid,
        status: RequestStatus,
    ) -> stock_request::Model {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        let row = stock_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            number: Set(format!("REQ-{}", suffix)),
            status: Set(status.to_string()),
            warehouse_id: Set(warehouse_id),
            responsible_id: Set(Uuid::new_v4()),
            order_id: Set(None),
            move_to_warehouse_id: Set(None),
            move_order_id: Set(None),
            comment: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        row.insert(&*self.state.db).await.expect("seed stock request")
    }

    pub async fn location(&self, id: Uuid) -> Option<stock_location::Model> {
        StockLocation::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("load ledger row")
    }
}

/// One ledger row to seed before a test.
pub struct LocationSeed {
    pub warehouse_id: Uuid,
    pub key: VariantKey,
    pub storage: Option<String>,
    pub total: i32,
    pub reserve: i32,
    pub priority: i32,
}

impl LocationSeed {
    pub fn new(warehouse_id: Uuid, key: VariantKey, total: i32, reserve: i32) -> Self {
        Self {
            warehouse_id,
            key,
            storage: None,
            total,
            reserve,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_storage(mut self, storage: &str) -> Self {
        self.storage = Some(storage.to_string());
        self
    }
}
