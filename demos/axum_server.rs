//! Example: an axum order service deduplicating retries through Redis.
//!
//! # Quick Start
//!
//! 1. Start Redis:
//!    ```bash
//!    docker run -p 6379:6379 redis:7-alpine
//!    ```
//!
//! 2. Run the example (from project root):
//!    ```bash
//!    IDEMPOTENCE_REDIS_HOST=127.0.0.1 IDEMPOTENCE_REDIS_PORT=6379 \
//!        cargo run --example axum_server
//!    ```
//!
//! 3. Send the same request twice:
//!    ```bash
//!    curl -i -X POST -H 'Idempotency-Key: order-1' localhost:3000/orders
//!    curl -i -X POST -H 'Idempotency-Key: order-1' localhost:3000/orders
//!    ```
//!
//! The first call returns `201 Created`; the retry returns `200 OK` with an
//! empty body. Run a second instance on another port against the same Redis
//! and retries are deduplicated across both.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use idempotency_gate::{FailurePolicy, IdempotencyLayer, RedisKeyStore, SpanTracer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Clone, Default)]
struct AppState {
    next_order: Arc<AtomicU64>,
}

async fn create_order(State(state): State<AppState>) -> (StatusCode, String) {
    let id = state.next_order.fetch_add(1, Ordering::SeqCst) + 1;
    info!(order_id = id, "Order created");
    (StatusCode::CREATED, format!("order {}\n", id))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .init();

    let store = RedisKeyStore::connect_from_env().await?;
    info!(config = ?store.config(), "Connected to Redis");

    let layer = IdempotencyLayer::builder(store)
        .with_claim_ttl(Duration::from_secs(180))
        .with_store_timeout(Duration::from_millis(250))
        .with_failure_policy(FailurePolicy::FailOpen)
        .with_tracer(SpanTracer::new())
        .build()?;
    let metrics = layer.metrics().clone();

    let app = Router::new()
        .route("/orders", post(create_order))
        .route(
            "/metrics",
            get(move || {
                let snapshot = metrics.snapshot();
                async move {
                    format!(
                        "claimed={} duplicates={} unprotected={} store_failures={}\n",
                        snapshot.claimed,
                        snapshot.duplicates,
                        snapshot.unprotected,
                        snapshot.store_failures
                    )
                }
            }),
        )
        .layer(layer)
        .with_state(AppState::default());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}
