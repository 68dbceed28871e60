pub mod catalog;
pub mod config;
pub mod consumers;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod repos;
pub mod routes;
pub mod service;

pub use consumers::email::start_email_consumer;
pub use consumers::payment::start_payment_listener;
pub use consumers::recorder::start_event_recorder;
