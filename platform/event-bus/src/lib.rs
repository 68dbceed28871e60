//! # Notification Bus
//!
//! A platform-level abstraction for the order-event notification pipeline.
//!
//! ## Why This Lives in Tier 1
//!
//! The notification bus is a **shared runtime capability**: the orders
//! service publishes to it, and every downstream consumer (event recorder,
//! email notifier, payment listener) subscribes to it. Placing it in
//! `platform/` allows:
//! - Services to depend on platform crates without circular dependencies
//! - Config-driven swap between NATS (production) and InMemory (dev/test)
//! - Per-subscription event-type filters shared by every implementation
//!
//! ## Implementations
//!
//! - **NatsBus**: production implementation over a NATS client
//! - **InMemoryBus**: dev/test implementation over in-memory channels
//!
//! ## Delivery semantics
//!
//! `publish` acknowledges *acceptance*, not delivery. Fan-out is
//! at-least-once per filter-matching subscriber; duplicates are possible and
//! consumers must tolerate them. Ordering is best-effort FIFO per consumer,
//! nothing more.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{BusMessage, EventBus, InMemoryBus, SubscriptionFilter};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! // Subscribe to order events, only ORDER_CREATED
//! let mut stream = bus
//!     .subscribe("orders.events", SubscriptionFilter::event_types(["ORDER_CREATED"]))
//!     .await?;
//!
//! // Publish an envelope with the event type as a filterable attribute
//! let msg = BusMessage::new("orders.events", b"{}".to_vec())
//!     .with_attribute(event_bus::EVENT_TYPE_ATTRIBUTE, "ORDER_CREATED");
//! bus.publish(msg).await?;
//!
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("received {} bytes on {}", msg.payload.len(), msg.subject);
//! }
//! # Ok(())
//! # }
//! ```

mod envelope;
mod inmemory_bus;
mod nats_bus;
pub mod queue;
pub mod retry;

pub use envelope::{
    BillingSummary, EntityKind, EventEnvelope, EventPayload, EventType, MalformedEvent,
    OrderEventData, ProductEventData, ShippingSummary,
};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;
pub use queue::{Batch, DeadLetter, DurableQueue, QueuePolicy, ReceivedMessage};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Message attribute carrying the envelope's event type, kept separate from
/// the body so filters can match without deserializing the payload.
pub const EVENT_TYPE_ATTRIBUTE: &str = "eventType";

/// A message published to, or received from, the notification bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject/topic this message was published to
    pub subject: String,
    /// The message payload (serialized envelope)
    pub payload: Vec<u8>,
    /// Filterable attributes carried outside the body (e.g. `eventType`)
    pub attributes: HashMap<String, String>,
    /// Bus-assigned delivery identifier
    pub message_id: String,
}

impl BusMessage {
    /// Create a new bus message with a generated message id
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            payload,
            attributes: HashMap::new(),
            message_id: Uuid::new_v4().to_string(),
        }
    }

    /// Attach a filterable attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Per-subscription predicate over the `eventType` message attribute.
///
/// A filter is an allow-list: a subscriber only receives messages whose
/// `eventType` attribute is in the list. Messages that don't match are
/// silently skipped for that subscriber — no error, no dead-lettering.
/// `SubscriptionFilter::any()` accepts every message.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    allowed: Option<HashSet<String>>,
}

impl SubscriptionFilter {
    /// Accept every message regardless of attributes
    pub fn any() -> Self {
        Self { allowed: None }
    }

    /// Accept only messages whose `eventType` attribute is in the allow-list.
    ///
    /// A message carrying no `eventType` attribute never matches an
    /// allow-list filter.
    pub fn event_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether this filter lets the given message through
    pub fn accepts(&self, msg: &BusMessage) -> bool {
        match &self.allowed {
            None => true,
            Some(allowed) => msg
                .attribute(EVENT_TYPE_ATTRIBUTE)
                .is_some_and(|t| allowed.contains(t)),
        }
    }
}

/// Errors that can occur when using the notification bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid subject pattern: {0}")]
    InvalidSubject(String),
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core publish/subscribe abstraction for the notification pipeline
///
/// `publish` is fire-and-forget from the publisher's perspective: it returns
/// once the bus has accepted the message, without waiting for any consumer.
/// `subscribe` registers a consumer for fan-out; every accepted message is
/// delivered to each subscriber whose filter matches it.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message to its subject.
    ///
    /// Returns `Ok(())` once the message has been accepted for delivery.
    /// Acceptance is not delivery confirmation.
    async fn publish(&self, message: BusMessage) -> BusResult<()>;

    /// Subscribe to messages matching a subject pattern and an attribute
    /// filter.
    ///
    /// Subject patterns support NATS-style wildcards:
    /// * `*` matches a single token (e.g. `orders.*`)
    /// * `>` matches one or more trailing tokens (e.g. `orders.>`)
    ///
    /// The returned stream yields only messages the filter accepts.
    async fn subscribe(
        &self,
        subject: &str,
        filter: SubscriptionFilter,
    ) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
