use axum::{routing::get, Router};
use event_store::{EventRecorder, EventStore, InMemoryEventStore, PostgresEventStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::EnvFilter;

use products_rs::{
    config::Config,
    db::init_pool,
    repo::{InMemoryProductRepository, PostgresProductRepository, ProductRepository},
    routes::{
        create_product, delete_product, get_product, get_products, health, update_product,
        AppState,
    },
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting products service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, store_type={}",
        config.host,
        config.port,
        config.store_type
    );

    let (repo, events): (Arc<dyn ProductRepository>, Arc<dyn EventStore>) =
        match config.store_type.to_lowercase().as_str() {
            "inmemory" => {
                tracing::info!("Using InMemory storage");
                (
                    Arc::new(InMemoryProductRepository::new()),
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
                    Arc::new(PostgresProductRepository::new(pool)),
                    Arc::new(event_store),
                )
            }
            _ => panic!(
                "Invalid STORE_TYPE: {}. Must be 'inmemory' or 'postgres'",
                config.store_type
            ),
        };

    let state = Arc::new(AppState {
        repo,
        recorder: EventRecorder::new(events),
        admin_email: config.admin_email.clone(),
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/products", get(get_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(2)))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Products service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
