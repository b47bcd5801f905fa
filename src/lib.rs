//! Stockroom: warehouse inventory reservation and stock-allocation engine.
//!
//! The crate owns the per-location quantity ledger (on-hand vs. reserved units
//! keyed by warehouse, product variant and storage bin), the selection policies
//! that decide which physical bin satisfies a reservation or a release, and the
//! idempotent message-driven pipeline that mutates the ledger in response to
//! domain events. The admin UI, authentication and catalog browsing live in
//! other systems and talk to this engine over the message bus.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod consumers;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod message_queue;
pub mod migrator;
pub mod resolvers;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use crate::config::AppConfig;
use crate::consumers::ConsumerContext;
use crate::events::EventSender;
use crate::message_queue::MessageQueue;
use crate::resolvers::{OrderGateway, VariantResolver};

/// Shared application state handed to the worker loop and to tests.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub context: Arc<ConsumerContext>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        event_sender: EventSender,
        resolver: Arc<dyn VariantResolver>,
        orders: Arc<dyn OrderGateway>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        let context = Arc::new(ConsumerContext::new(
            db.clone(),
            config.clone(),
            resolver,
            orders,
            queue,
            event_sender.clone(),
        ));
        Self {
            db,
            config,
            event_sender,
            context,
        }
    }
}
