//! Event recorder consumer
//!
//! Subscribes to the order topic unfiltered and turns every delivered
//! envelope into an event store record. Append failures get the local
//! retry policy; exhaustion is logged and the delivery is dropped — the
//! recorder path has no dead-letter queue of its own.

use event_bus::retry::{retry_with_backoff, RetryPolicy};
use event_bus::{EventBus, EventEnvelope, SubscriptionFilter};
use event_store::EventRecorder;
use futures::StreamExt;
use std::sync::Arc;
use tracing::Instrument;

use crate::events::ORDER_EVENTS_SUBJECT;

/// Start the recorder task for the order topic
pub fn start_event_recorder(bus: Arc<dyn EventBus>, recorder: EventRecorder) {
    tokio::spawn(async move {
        tracing::info!("starting event recorder consumer");

        let mut stream = match bus
            .subscribe(ORDER_EVENTS_SUBJECT, SubscriptionFilter::any())
            .await
        {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(subject = ORDER_EVENTS_SUBJECT, error = %e, "failed to subscribe");
                return;
            }
        };

        tracing::info!(subject = ORDER_EVENTS_SUBJECT, "subscribed");

        let retry_policy = RetryPolicy::default();

        while let Some(msg) = stream.next().await {
            let envelope = match EventEnvelope::from_message(&msg) {
                Ok(envelope) => envelope,
                Err(e) => {
                    // Malformed envelopes are the publisher's fault and
                    // cannot succeed on redelivery
                    tracing::error!(
                        subject = %msg.subject,
                        message_id = %msg.message_id,
                        error = %e,
                        "discarding malformed envelope"
                    );
                    continue;
                }
            };

            let span = tracing::info_span!(
                "record_event",
                event_type = %envelope.event_type,
                subject_id = %envelope.subject_id,
                message_id = %msg.message_id,
                request_id = %envelope.request_id
            );

            async {
                let result = retry_with_backoff(
                    || recorder.record(&envelope, &msg.message_id),
                    &retry_policy,
                    "record_event",
                )
                .await;

                if let Err(e) = result {
                    tracing::error!(error = %e, "event not recorded after retries");
                }
            }
            .instrument(span)
            .await;
        }

        tracing::warn!("event recorder consumer stopped");
    });
}
