//! # Event Store
//!
//! Durable, queryable history of what happened to each order and product.
//!
//! The store is a short-lived audit/debug trail, not permanent history:
//! every record carries an absolute expiry (`ttl`) five minutes after its
//! creation, and expired records are invisible to every query.
//!
//! ## Key scheme
//!
//! - Partition key `#<entityKind>_<subjectId>` groups all history for one
//!   order or product; point lookups are O(1) on it.
//! - Sort key `<eventType>#<createdAtMillis>` yields chronological ordering
//!   within a partition and prefix queries by event-type family.
//! - A secondary index on `(email, eventType)` answers "all events for a
//!   customer" without scanning.
//!
//! ## Implementations
//!
//! - **PostgresEventStore**: production implementation over sqlx
//! - **InMemoryEventStore**: dev/test implementation with an injectable
//!   clock, so expiry is testable at a simulated time
//!
//! Truth ordering note: consumers may deliver concurrently and out of
//! order; the sort key, not delivery order, establishes history order.

mod memory;
mod postgres;
mod recorder;

pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use recorder::EventRecorder;

use async_trait::async_trait;
use event_bus::EntityKind;
use serde::{Deserialize, Serialize};

/// Seconds a record stays queryable after creation
pub const RECORD_TTL_SECS: i64 = 300;

/// Event-specific detail carried on a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventInfo {
    #[serde(rename_all = "camelCase")]
    Order {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_codes: Option<Vec<String>>,
        /// Delivery id of the bus message that produced this record
        message_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Product {
        product_id: String,
        product_price: f64,
    },
}

/// One row of event history, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Partition key: `#<entityKind>_<subjectId>`
    pub pk: String,
    /// Sort key: `<eventType>#<createdAtMillis>`
    pub sk: String,
    /// Absolute expiry, second epoch
    pub ttl: i64,
    /// Customer email (secondary index partition)
    pub email: String,
    /// Recorder-assigned creation time, millisecond epoch
    pub created_at: i64,
    /// Correlation id of the originating request
    pub request_id: String,
    pub event_type: String,
    pub info: EventInfo,
}

impl EventRecord {
    /// Partition key for an entity's history
    pub fn partition_key(kind: EntityKind, subject_id: &str) -> String {
        format!("#{}_{}", kind.as_str(), subject_id)
    }

    /// Sort key for one event occurrence
    pub fn sort_key(event_type: &str, created_at: i64) -> String {
        format!("{event_type}#{created_at}")
    }

    /// Whether the record has expired at the given second-epoch instant
    pub fn expired_at(&self, now_secs: i64) -> bool {
        now_secs > self.ttl
    }
}

/// Errors surfaced by event store operations
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Underlying storage unavailable — eligible for one local retry with
    /// backoff, then propagate.
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    #[error("event record serialization failed: {0}")]
    Serialization(String),
}

/// Store abstraction shared by the recorder and the query endpoints
///
/// Appends are last-write-wins: re-appending an identical key overwrites
/// with identical content and is not an error, which is what makes
/// at-least-once delivery safe upstream.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Write one record; duplicate keys overwrite silently. Returns the
    /// written record.
    async fn append(&self, record: EventRecord) -> Result<EventRecord, EventStoreError>;

    /// All non-expired records for one entity's partition, sort-key
    /// ascending. Empty when none exist — never an error.
    async fn query_by_entity(
        &self,
        kind: EntityKind,
        subject_id: &str,
    ) -> Result<Vec<EventRecord>, EventStoreError>;

    /// Non-expired records for a customer via the secondary index.
    ///
    /// `event_type_prefix` restricts to an event-type family (`"ORDER_"`)
    /// or, as a full type string, to a single type; `None` returns every
    /// type. Ordered by event type, then occurrence time.
    async fn query_by_customer(
        &self,
        email: &str,
        event_type_prefix: Option<&str>,
    ) -> Result<Vec<EventRecord>, EventStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_shape() {
        assert_eq!(EventRecord::partition_key(EntityKind::Order, "o1"), "#order_o1");
        assert_eq!(
            EventRecord::partition_key(EntityKind::Product, "P1"),
            "#product_P1"
        );
    }

    #[test]
    fn sort_key_orders_chronologically_within_a_type() {
        let earlier = EventRecord::sort_key("ORDER_CREATED", 1000);
        let later = EventRecord::sort_key("ORDER_CREATED", 2000);
        assert!(earlier < later);
    }

    #[test]
    fn info_serializes_camel_case() {
        let info = EventInfo::Order {
            order_id: "o1".to_string(),
            product_codes: Some(vec!["P1".to_string()]),
            message_id: "m1".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["orderId"], "o1");
        assert_eq!(json["productCodes"][0], "P1");
        assert_eq!(json["messageId"], "m1");
    }

    #[test]
    fn expiry_is_strict() {
        let record = EventRecord {
            pk: "#order_o1".to_string(),
            sk: "ORDER_CREATED#1000".to_string(),
            ttl: 100,
            email: "a@b.com".to_string(),
            created_at: 1000,
            request_id: "r1".to_string(),
            event_type: "ORDER_CREATED".to_string(),
            info: EventInfo::Order {
                order_id: "o1".to_string(),
                product_codes: None,
                message_id: "m1".to_string(),
            },
        };
        assert!(!record.expired_at(100));
        assert!(record.expired_at(101));
    }
}
