//! Email notification pipeline tests
//!
//! Exercise the ORDER_CREATED path through the durable queue: batch
//! delivery, all-or-nothing acknowledgment and dead-letter routing.

use std::sync::Arc;
use std::time::Duration;

use event_bus::{
    BusMessage, DurableQueue, EventBus, EventType, InMemoryBus, QueuePolicy, SubscriptionFilter,
    EVENT_TYPE_ATTRIBUTE,
};

use orders_rs::consumers::email::RecordingEmailSender;
use orders_rs::events::{OrderEventPublisher, ORDER_EVENTS_SUBJECT};
use orders_rs::models::{
    CarrierType, Order, OrderBilling, OrderProduct, OrderShipping, PaymentType, ShippingType,
};
use orders_rs::start_email_consumer;

fn fast_policy() -> QueuePolicy {
    QueuePolicy {
        batch_size: 10,
        max_batch_wait: Duration::from_millis(30),
        max_receive_count: 3,
        retention: Duration::from_secs(60),
        dlq_retention: Duration::from_secs(60),
    }
}

fn order(id: &str) -> Order {
    Order {
        email: "a@b.com".to_string(),
        id: id.to_string(),
        created_at: 1000,
        shipping: OrderShipping {
            kind: ShippingType::Economic,
            carrier: CarrierType::Correios,
        },
        billing: OrderBilling {
            payment: PaymentType::Cash,
            total_price: 10.0,
        },
        products: vec![OrderProduct {
            code: "P1".to_string(),
            price: 10.0,
        }],
    }
}

async fn pipeline(sender: &RecordingEmailSender) -> (Arc<InMemoryBus>, Arc<DurableQueue>) {
    let bus = Arc::new(InMemoryBus::new());
    let queue = Arc::new(DurableQueue::with_policy(fast_policy()));
    queue.bind(
        bus.clone() as Arc<dyn EventBus>,
        ORDER_EVENTS_SUBJECT,
        SubscriptionFilter::event_types([EventType::OrderCreated.as_str()]),
    );
    start_email_consumer(queue.clone(), Arc::new(sender.clone()));
    // Let the binding and consumer tasks start up
    tokio::time::sleep(Duration::from_millis(50)).await;
    (bus, queue)
}

#[tokio::test]
async fn confirmation_email_is_sent_for_created_order() {
    let sender = RecordingEmailSender::new();
    let (bus, _queue) = pipeline(&sender).await;

    let publisher = OrderEventPublisher::new(bus.clone());
    publisher
        .publish(EventType::OrderCreated, &order("o1"), "r1")
        .await
        .unwrap();

    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = sender.sent();
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].subject, "Order Confirmation - o1");
    assert!(sent[0].body.contains("o1"));
}

#[tokio::test]
async fn deleted_orders_do_not_reach_the_email_queue() {
    let sender = RecordingEmailSender::new();
    let (bus, queue) = pipeline(&sender).await;

    let publisher = OrderEventPublisher::new(bus.clone());
    publisher
        .publish(EventType::OrderDeleted, &order("o1"), "r1")
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(sender.sent().is_empty());
    assert_eq!(queue.pending_len(), 0);
    assert!(queue.dead_letters().is_empty());
}

#[tokio::test]
async fn failing_delivery_dead_letters_the_message_after_three_receives() {
    let sender = RecordingEmailSender::new();
    sender.set_failing(true);
    let (bus, queue) = pipeline(&sender).await;

    let publisher = OrderEventPublisher::new(bus.clone());
    publisher
        .publish(EventType::OrderCreated, &order("o-poison"), "r1")
        .await
        .unwrap();

    let mut dead = Vec::new();
    for _ in 0..100 {
        dead = queue.dead_letters();
        if !dead.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(dead.len(), 1, "message must land in the DLQ");
    assert_eq!(dead[0].receive_count, 3);
    assert_eq!(queue.pending_len(), 0, "primary queue no longer surfaces it");
    assert!(sender.sent().is_empty());

    // Recovery does not resurrect dead letters
    sender.set_failing(false);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn poison_message_in_batch_blocks_none_after_it_is_dead_lettered() {
    let sender = RecordingEmailSender::new();
    let (bus, queue) = pipeline(&sender).await;

    // A non-envelope body with a matching attribute poisons its batch
    bus.publish(
        BusMessage::new(ORDER_EVENTS_SUBJECT, b"not an envelope".to_vec())
            .with_attribute(EVENT_TYPE_ATTRIBUTE, "ORDER_CREATED"),
    )
    .await
    .unwrap();

    let mut dead = Vec::new();
    for _ in 0..100 {
        dead = queue.dead_letters();
        if !dead.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(dead.len(), 1);
    assert!(dead[0].error.contains("malformed"));

    // The pipeline keeps flowing for well-formed events
    let publisher = OrderEventPublisher::new(bus.clone());
    publisher
        .publish(EventType::OrderCreated, &order("o2"), "r2")
        .await
        .unwrap();

    let mut sent = Vec::new();
    for _ in 0..100 {
        sent = sender.sent();
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Order Confirmation - o2");
}
