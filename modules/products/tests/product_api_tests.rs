//! Product catalog tests
//!
//! Handlers are exercised directly against the in-memory repository and
//! event store — the same wiring the service uses with STORE_TYPE=inmemory.

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use std::time::Duration;

use event_bus::EntityKind;
use event_store::{EventInfo, EventRecorder, EventStore, InMemoryEventStore};

use products_rs::error::ProductsError;
use products_rs::models::ProductRequest;
use products_rs::repo::InMemoryProductRepository;
use products_rs::routes::{
    create_product, delete_product, get_product, get_products, update_product, AppState,
};

struct TestApp {
    state: Arc<AppState>,
    events: Arc<InMemoryEventStore>,
}

fn test_app() -> TestApp {
    let events = Arc::new(InMemoryEventStore::new());
    let state = Arc::new(AppState {
        repo: Arc::new(InMemoryProductRepository::new()),
        recorder: EventRecorder::new(events.clone()),
        admin_email: "admin@store.local".to_string(),
    });
    TestApp { state, events }
}

fn request(code: &str, price: f64) -> ProductRequest {
    ProductRequest {
        product_name: format!("Product {code}"),
        code: code.to_string(),
        price,
        model: "M-1".to_string(),
        product_url: "https://example.com/p".to_string(),
    }
}

async fn wait_for_history(
    app: &TestApp,
    code: &str,
    expected: usize,
) -> Vec<event_store::EventRecord> {
    for _ in 0..50 {
        let history = app
            .events
            .query_by_entity(EntityKind::Product, code)
            .await
            .unwrap();
        if history.len() >= expected {
            return history;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("product history never reached {expected} records");
}

#[tokio::test]
async fn create_assigns_id_and_records_created_event() {
    let app = test_app();

    let (status, Json(product)) =
        create_product(State(app.state.clone()), Json(request("P1", 25.5)))
            .await
            .unwrap();
    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert!(!product.id.is_empty());

    let history = wait_for_history(&app, "P1", 1).await;
    assert_eq!(history[0].event_type, "PRODUCT_CREATED");
    assert_eq!(history[0].pk, "#product_P1");
    assert_eq!(history[0].email, "admin@store.local");
    match &history[0].info {
        EventInfo::Product {
            product_id,
            product_price,
        } => {
            assert_eq!(product_id, &product.id);
            assert_eq!(*product_price, 25.5);
        }
        EventInfo::Order { .. } => panic!("expected product info"),
    }
}

#[tokio::test]
async fn update_and_delete_record_their_events() {
    let app = test_app();

    let (_, Json(product)) = create_product(State(app.state.clone()), Json(request("P2", 10.0)))
        .await
        .unwrap();

    let Json(updated) = update_product(
        State(app.state.clone()),
        Path(product.id.clone()),
        Json(request("P2", 12.0)),
    )
    .await
    .unwrap();
    assert_eq!(updated.price, 12.0);

    let Json(removed) = delete_product(State(app.state.clone()), Path(product.id.clone()))
        .await
        .unwrap();
    assert_eq!(removed.id, product.id);

    let history = wait_for_history(&app, "P2", 3).await;
    let types: Vec<&str> = history.iter().map(|r| r.event_type.as_str()).collect();
    assert!(types.contains(&"PRODUCT_CREATED"));
    assert!(types.contains(&"PRODUCT_UPDATED"));
    assert!(types.contains(&"PRODUCT_DELETED"));
}

#[tokio::test]
async fn fetch_routes_return_catalog_contents() {
    let app = test_app();

    let (_, Json(product)) = create_product(State(app.state.clone()), Json(request("P3", 5.0)))
        .await
        .unwrap();

    let Json(all) = get_products(State(app.state.clone())).await.unwrap();
    assert_eq!(all.len(), 1);

    let Json(one) = get_product(State(app.state.clone()), Path(product.id.clone()))
        .await
        .unwrap();
    assert_eq!(one, product);
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let app = test_app();

    let err = get_product(State(app.state.clone()), Path("missing".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProductsError::ProductNotFound));

    let err = update_product(
        State(app.state.clone()),
        Path("missing".to_string()),
        Json(request("P9", 1.0)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ProductsError::ProductNotFound));

    let err = delete_product(State(app.state.clone()), Path("missing".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProductsError::ProductNotFound));
}

#[tokio::test]
async fn empty_code_is_rejected_before_any_write() {
    let app = test_app();

    let err = create_product(State(app.state.clone()), Json(request("", 1.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, ProductsError::Validation(_)));

    let Json(all) = get_products(State(app.state.clone())).await.unwrap();
    assert!(all.is_empty());
    assert!(app.events.is_empty());
}
