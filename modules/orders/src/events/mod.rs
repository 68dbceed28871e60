pub mod publisher;

pub use publisher::{OrderEventPublisher, ORDER_EVENTS_SUBJECT};
