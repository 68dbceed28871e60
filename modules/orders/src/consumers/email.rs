//! Order confirmation email consumer
//!
//! Drains the durable queue bound to ORDER_CREATED events and sends one
//! confirmation email per message. A batch is acknowledged or failed as a
//! whole: one failing send returns every message in the batch to the queue
//! for redelivery, and repeat offenders end up in the dead-letter queue.

use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use event_bus::queue::Batch;
use event_bus::{DurableQueue, EventEnvelope, EventPayload};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("malformed order event: {0}")]
    Malformed(String),

    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Outbound email delivery
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

/// Start the email consumer loop on a bound queue
pub fn start_email_consumer(queue: Arc<DurableQueue>, sender: Arc<dyn EmailSender>) {
    tokio::spawn(async move {
        tracing::info!("starting order email consumer");
        loop {
            let batch = queue.receive_batch().await;
            tracing::debug!(count = batch.len(), "email batch received");

            match send_batch(sender.as_ref(), &batch).await {
                Ok(()) => queue.acknowledge(batch),
                Err(e) => queue.fail(batch, &e.to_string()),
            }
        }
    });
}

/// Send a confirmation for every message in the batch; the first failure
/// fails the whole batch.
pub async fn send_batch(sender: &dyn EmailSender, batch: &Batch) -> Result<(), EmailError> {
    for received in &batch.messages {
        let envelope = EventEnvelope::from_message(&received.message)
            .map_err(|e| EmailError::Malformed(e.to_string()))?;

        let EventPayload::Order(data) = &envelope.data else {
            continue;
        };

        let subject = format!("Order Confirmation - {}", data.order_id);
        let body = format!(
            "Your order with ID {} has been received and is being processed.",
            data.order_id
        );
        sender.send(&data.email, &subject, &body).await?;

        tracing::info!(
            order_id = %data.order_id,
            to = %data.email,
            message_id = %received.message.message_id,
            "order confirmation sent"
        );
    }
    Ok(())
}

// ============================================================================
// SENDERS
// ============================================================================

/// SES-backed sender for production
pub struct SesEmailSender {
    client: aws_sdk_sesv2::Client,
    source: String,
}

impl SesEmailSender {
    /// Build a sender from the ambient AWS configuration
    pub async fn from_env(source: String) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_sesv2::Client::new(&config),
            source,
        }
    }
}

#[async_trait]
impl EmailSender for SesEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let subject = Content::builder()
            .data(subject)
            .build()
            .map_err(|e| EmailError::Delivery(e.to_string()))?;

        let text = Content::builder()
            .data(body)
            .build()
            .map_err(|e| EmailError::Delivery(e.to_string()))?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().text(text).build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.source)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| EmailError::Delivery(e.to_string()))?;

        Ok(())
    }
}

/// Sender that only logs — the default when no SES source is configured
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        tracing::info!(to, subject, "email send (logging sender)");
        Ok(())
    }
}

/// Test double that records sent emails and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    fail: Arc<Mutex<bool>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("sender mutex poisoned").clone()
    }

    /// Make every subsequent send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().expect("sender mutex poisoned") = failing;
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        if *self.fail.lock().expect("sender mutex poisoned") {
            return Err(EmailError::Delivery("simulated send failure".to_string()));
        }
        self.sent
            .lock()
            .expect("sender mutex poisoned")
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
