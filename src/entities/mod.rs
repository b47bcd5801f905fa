pub mod handled_message;
pub mod stock_location;
pub mod stock_request;
pub mod stock_request_item;
