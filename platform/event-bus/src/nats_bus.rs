//! NATS-based implementation of the EventBus trait

use crate::{BusError, BusMessage, BusResult, EventBus, SubscriptionFilter};
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

/// Header carrying the bus-assigned message id across the broker
const MESSAGE_ID_HEADER: &str = "Bus-Message-Id";

/// Production bus implementation over a NATS client
///
/// Message attributes travel as NATS headers, so subscription filters see
/// the same out-of-band `eventType` they see on the in-memory bus.
///
/// # Example
/// ```rust,no_run
/// use event_bus::{EventBus, NatsBus};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = async_nats::connect("nats://localhost:4222").await?;
/// let bus = NatsBus::new(client);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Create a new NatsBus from an already-connected client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Direct access to the underlying NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, message: BusMessage) -> BusResult<()> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert(MESSAGE_ID_HEADER, message.message_id.as_str());
        for (key, value) in &message.attributes {
            headers.insert(key.as_str(), value.as_str());
        }

        self.client
            .publish_with_headers(message.subject, headers, message.payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        filter: SubscriptionFilter,
    ) -> BusResult<BoxStream<'static, BusMessage>> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let stream = subscriber
            .map(|nats_msg| {
                let mut msg =
                    BusMessage::new(nats_msg.subject.to_string(), nats_msg.payload.to_vec());

                if let Some(nats_headers) = nats_msg.headers {
                    for (key, values) in nats_headers.iter() {
                        if let Some(value) = values.first() {
                            if key.to_string() == MESSAGE_ID_HEADER {
                                msg.message_id = value.to_string();
                            } else {
                                msg.attributes.insert(key.to_string(), value.to_string());
                            }
                        }
                    }
                }

                msg
            })
            .filter(move |msg| futures::future::ready(filter.accepts(msg)));

        Ok(stream.boxed())
    }
}
