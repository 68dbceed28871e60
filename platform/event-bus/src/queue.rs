//! Durable consumer queue with batch delivery and dead-letter routing
//!
//! Consumers that batch work (the email notifier) do not process one
//! envelope per invocation; they drain a buffered queue bound to the bus.
//! Messages accumulate until a batch-size threshold or a maximum wait
//! window elapses, whichever comes first. A batch is acknowledged or failed
//! as a whole; messages that fail too many consecutive receives move to a
//! dead-letter queue where operators can inspect them before they age out.

use crate::{BusMessage, EventBus, SubscriptionFilter};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Delivery policy for a durable queue
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    /// Deliver as soon as this many messages are pending
    pub batch_size: usize,
    /// Deliver a partial batch once the oldest pending message has waited
    /// this long
    pub max_batch_wait: Duration,
    /// Move a message to the dead-letter queue after this many failed
    /// receives
    pub max_receive_count: u32,
    /// Working retention of the primary queue
    pub retention: Duration,
    /// Retention of the dead-letter queue (longer, for operator inspection)
    pub dlq_retention: Duration,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_batch_wait: Duration::from_secs(300),
            max_receive_count: 3,
            retention: Duration::from_secs(4 * 24 * 3600),
            dlq_retention: Duration::from_secs(10 * 24 * 3600),
        }
    }
}

/// A message delivered as part of a batch, with its receive count
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message: BusMessage,
    /// How many times this message has been delivered, this delivery
    /// included
    pub receive_count: u32,
    enqueued_at: Instant,
}

/// A batch of messages leased to a consumer.
///
/// Every batch must be returned to the queue through
/// [`DurableQueue::acknowledge`] or [`DurableQueue::fail`]; partial-batch
/// acknowledgment is not supported.
#[derive(Debug)]
pub struct Batch {
    pub messages: Vec<ReceivedMessage>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A message that exhausted its delivery attempts
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub message: BusMessage,
    pub receive_count: u32,
    /// Error reported by the consumer on the final failed receive
    pub error: String,
    dead_at: Instant,
}

struct Pending {
    message: BusMessage,
    receive_count: u32,
    enqueued_at: Instant,
}

struct QueueState {
    pending: VecDeque<Pending>,
    dead: VecDeque<DeadLetter>,
}

/// Buffered, retrying delivery channel for batch consumers
///
/// The in-process rendition of a broker-managed queue: the policy knobs
/// (batch size, wait window, receive limit, retention) carry the managed
/// queue's numbers so a broker-backed implementation can sit behind the
/// same surface.
pub struct DurableQueue {
    policy: QueuePolicy,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl DurableQueue {
    /// Create a queue with the default policy
    pub fn new() -> Self {
        Self::with_policy(QueuePolicy::default())
    }

    /// Create a queue with an explicit policy
    pub fn with_policy(policy: QueuePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                dead: VecDeque::new(),
            }),
            notify: Notify::new(),
        }
    }

    /// Subscribe the queue to a bus subject and forward matching messages
    /// into it.
    ///
    /// This is the queue's subscription binding: the forwarding task runs
    /// until the bus stream ends.
    pub fn bind(
        self: &Arc<Self>,
        bus: Arc<dyn EventBus>,
        subject: &str,
        filter: SubscriptionFilter,
    ) {
        let queue = Arc::clone(self);
        let subject = subject.to_string();
        tokio::spawn(async move {
            let mut stream = match bus.subscribe(&subject, filter).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(subject = %subject, error = %e, "failed to bind queue to bus");
                    return;
                }
            };
            tracing::info!(subject = %subject, "queue bound to bus");

            while let Some(msg) = futures::StreamExt::next(&mut stream).await {
                queue.enqueue(msg).await;
            }

            tracing::warn!(subject = %subject, "queue binding stopped");
        });
    }

    /// Add a message to the queue
    pub async fn enqueue(&self, message: BusMessage) {
        {
            let mut state = self.state.lock().expect("queue mutex poisoned");
            self.purge_expired(&mut state);
            state.pending.push_back(Pending {
                message,
                receive_count: 0,
                enqueued_at: Instant::now(),
            });
        }
        self.notify.notify_one();
    }

    /// Wait for a batch of messages.
    ///
    /// Suspends until `batch_size` messages are pending, or until the
    /// oldest pending message has waited `max_batch_wait`, whichever comes
    /// first. Always returns at least one message. This is the only
    /// suspension point of the consumer side.
    pub async fn receive_batch(&self) -> Batch {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("queue mutex poisoned");
                self.purge_expired(&mut state);

                if state.pending.len() >= self.policy.batch_size {
                    return self.take_batch(&mut state);
                }
                match state.pending.front() {
                    Some(oldest) => {
                        let waited = oldest.enqueued_at.elapsed();
                        if waited >= self.policy.max_batch_wait {
                            return self.take_batch(&mut state);
                        }
                        Some(self.policy.max_batch_wait - waited)
                    }
                    None => None,
                }
            };

            match wait {
                Some(window) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep(window) => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Acknowledge a fully processed batch, removing its messages for good
    pub fn acknowledge(&self, batch: Batch) {
        tracing::debug!(count = batch.len(), "batch acknowledged");
    }

    /// Fail a batch: every message becomes visible again for redelivery,
    /// except messages that have exhausted `max_receive_count`, which move
    /// to the dead-letter queue.
    pub fn fail(&self, batch: Batch, error: &str) {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        for received in batch.messages {
            if received.receive_count >= self.policy.max_receive_count {
                tracing::error!(
                    message_id = %received.message.message_id,
                    subject = %received.message.subject,
                    receive_count = received.receive_count,
                    error = %error,
                    "message moved to DLQ after retries exhausted"
                );
                state.dead.push_back(DeadLetter {
                    message: received.message,
                    receive_count: received.receive_count,
                    error: error.to_string(),
                    dead_at: Instant::now(),
                });
            } else {
                tracing::warn!(
                    message_id = %received.message.message_id,
                    receive_count = received.receive_count,
                    error = %error,
                    "batch failed, message returned to queue"
                );
                state.pending.push_back(Pending {
                    message: received.message,
                    receive_count: received.receive_count,
                    enqueued_at: received.enqueued_at,
                });
            }
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Snapshot of the dead-letter queue for operator inspection
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        self.purge_expired(&mut state);
        state.dead.iter().cloned().collect()
    }

    /// Number of messages currently visible in the primary queue
    pub fn pending_len(&self) -> usize {
        self.state
            .lock()
            .expect("queue mutex poisoned")
            .pending
            .len()
    }

    fn take_batch(&self, state: &mut QueueState) -> Batch {
        let count = state.pending.len().min(self.policy.batch_size);
        let messages = state
            .pending
            .drain(..count)
            .map(|mut pending| {
                pending.receive_count += 1;
                ReceivedMessage {
                    message: pending.message,
                    receive_count: pending.receive_count,
                    enqueued_at: pending.enqueued_at,
                }
            })
            .collect();
        Batch { messages }
    }

    fn purge_expired(&self, state: &mut QueueState) {
        let before = state.pending.len();
        state
            .pending
            .retain(|p| p.enqueued_at.elapsed() < self.policy.retention);
        let dropped = before - state.pending.len();
        if dropped > 0 {
            tracing::warn!(dropped, "messages aged out of primary queue");
        }
        state
            .dead
            .retain(|d| d.dead_at.elapsed() < self.policy.dlq_retention);
    }
}

impl Default for DurableQueue {
    fn default() -> Self {
        Self::new()
    }
}
