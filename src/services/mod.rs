pub mod approval_monitor;
pub mod atomic_adjuster;
pub mod deduplicator;
pub mod location_selector;
pub mod stock_requests;

pub use approval_monitor::ApprovalThresholdMonitor;
pub use atomic_adjuster::{AdjustBy, AtomicAdjuster};
pub use deduplicator::{DeduplicationHandle, Deduplicator};
pub use location_selector::LocationSelector;
pub use stock_requests::StockRequestService;
