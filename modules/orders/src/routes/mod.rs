pub mod order_events;
pub mod orders;
