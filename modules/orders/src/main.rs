use axum::{
    routing::{get, post},
    Router,
};
use event_bus::{DurableQueue, EventBus, EventType, InMemoryBus, NatsBus, SubscriptionFilter};
use event_store::{EventRecorder, EventStore, InMemoryEventStore, PostgresEventStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::EnvFilter;

use orders_rs::{
    catalog::{InMemoryProductCatalog, PostgresProductCatalog, ProductCatalog},
    config::Config,
    consumers::email::{EmailSender, LoggingEmailSender, SesEmailSender},
    db::init_pool,
    events::{OrderEventPublisher, ORDER_EVENTS_SUBJECT},
    repos::order_repo::{InMemoryOrderRepository, OrderStore, PostgresOrderRepository},
    routes::order_events::get_order_events,
    routes::orders::{create_order, delete_order, get_orders, health},
    service::AppState,
    start_email_consumer, start_event_recorder, start_payment_listener,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting orders service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, store_type={}, bus_type={}",
        config.host,
        config.port,
        config.store_type,
        config.bus_type
    );

    // Notification bus
    let bus: Arc<dyn EventBus> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        "nats" => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBus::new(client))
        }
        _ => panic!(
            "Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'",
            config.bus_type
        ),
    };

    // Storage backends
    let (orders, catalog, events): (
        Arc<dyn OrderStore>,
        Arc<dyn ProductCatalog>,
        Arc<dyn EventStore>,
    ) = match config.store_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory storage");
            (
                Arc::new(InMemoryOrderRepository::new()),
                Arc::new(InMemoryProductCatalog::new()),
                Arc::new(InMemoryEventStore::new()),
            )
        }
        "postgres" => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set when STORE_TYPE=postgres");

            tracing::info!("Connecting to database...");
            let pool = init_pool(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running migrations...");
            sqlx::migrate!("./db/migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            let event_store = PostgresEventStore::new(pool.clone());
            event_store
                .ensure_schema()
                .await
                .expect("Failed to create events schema");

            (
                Arc::new(PostgresOrderRepository::new(pool.clone())),
                Arc::new(PostgresProductCatalog::new(pool)),
                Arc::new(event_store),
            )
        }
        _ => panic!(
            "Invalid STORE_TYPE: {}. Must be 'inmemory' or 'postgres'",
            config.store_type
        ),
    };

    // Event recorder consumer (direct fan-out, unfiltered)
    let recorder = EventRecorder::new(events.clone());
    start_event_recorder(bus.clone(), recorder);

    // Email consumer behind the durable queue, ORDER_CREATED only
    let email_queue = Arc::new(DurableQueue::new());
    email_queue.bind(
        bus.clone(),
        ORDER_EVENTS_SUBJECT,
        SubscriptionFilter::event_types([EventType::OrderCreated.as_str()]),
    );
    let sender: Arc<dyn EmailSender> = match &config.email_source {
        Some(source) => {
            tracing::info!(source, "Using SES email sender");
            Arc::new(SesEmailSender::from_env(source.clone()).await)
        }
        None => {
            tracing::info!("EMAIL_SOURCE not set, using logging email sender");
            Arc::new(LoggingEmailSender)
        }
    };
    start_email_consumer(email_queue, sender);

    // Payment listener (direct fan-out, ORDER_CREATED only)
    start_payment_listener(bus.clone());

    let state = Arc::new(AppState {
        orders,
        catalog,
        events,
        publisher: OrderEventPublisher::new(bus),
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route(
            "/orders",
            post(create_order).get(get_orders).delete(delete_order),
        )
        .route("/orders/events", get(get_order_events))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(2)))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Orders service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
