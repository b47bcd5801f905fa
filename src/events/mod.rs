use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::stock_request::RequestStatus;

/// Domain events emitted around ledger mutations and request transitions.
///
/// `RequestHidden` and `RequestRemoved` feed the real-time notification
/// channel that tells other admin viewers to drop a request from their
/// screens; delivery is fire-and-forget and failure is never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    RequestCreated {
        request_id: Uuid,
        number: String,
        status: RequestStatus,
    },
    RequestAdvanced {
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    },
    RequestHidden(Uuid),
    RequestRemoved(Uuid),
    LedgerAdjusted {
        location_id: Uuid,
        warehouse_id: Uuid,
        product_id: Uuid,
        total_delta: i32,
        reserve_delta: i32,
    },
    RecountFlagged {
        location_id: Uuid,
        warehouse_id: Uuid,
        product_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. This log stream is the only
/// externally observable audit trail of the engine.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::RequestCreated {
                request_id,
                ref number,
                status,
            } => {
                info!(request_id = %request_id, number = %number, status = %status, "request created");
            }
            Event::RequestAdvanced {
                request_id,
                from,
                to,
            } => {
                info!(request_id = %request_id, from = %from, to = %to, "request advanced");
            }
            Event::RequestHidden(request_id) => {
                info!(request_id = %request_id, "hide request from other viewers");
            }
            Event::RequestRemoved(request_id) => {
                info!(request_id = %request_id, "remove request from other viewers");
            }
            Event::LedgerAdjusted {
                location_id,
                warehouse_id,
                product_id,
                total_delta,
                reserve_delta,
            } => {
                info!(
                    location_id = %location_id,
                    warehouse_id = %warehouse_id,
                    product_id = %product_id,
                    total_delta = total_delta,
                    reserve_delta = reserve_delta,
                    "ledger adjusted"
                );
            }
            Event::RecountFlagged {
                location_id,
                warehouse_id,
                product_id,
            } => {
                warn!(
                    location_id = %location_id,
                    warehouse_id = %warehouse_id,
                    product_id = %product_id,
                    "bin flagged for manual recount"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}
