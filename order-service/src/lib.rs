use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

mod journal;
mod store;

pub use journal::{Journal, JOURNAL_FILE, SNAPSHOT_FILE};
pub use store::{Order, OrderStore, StoreError};

/// Number of placeholder orders a fresh service starts with.
pub const SEED_ORDER_COUNT: u64 = 120;

/// Committed inserts between two snapshots of the order table.
pub const SNAPSHOT_COMMAND_COUNT: u64 = 100;

pub fn router(store: OrderStore) -> Router {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/:id", get(fetch_order))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}

/// Serve the order routes on an already-bound listener until the server fails.
pub async fn serve(listener: TcpListener, store: OrderStore) -> anyhow::Result<()> {
    info!(
        "Order service listening on {} with {} orders",
        listener.local_addr()?,
        store.len()?
    );
    axum::serve(listener, router(store)).await?;
    Ok(())
}

#[debug_handler]
pub async fn place_order(
    State(store): State<OrderStore>,
    Json(order): Json<Order>,
) -> Result<StatusCode, StoreError> {
    counter!("order_service_requests", "route" => "place_order").increment(1);
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);

    debug!("Placing order {}", order.order_id);
    store.insert(order)?;
    Ok(StatusCode::OK)
}

#[debug_handler]
pub async fn fetch_order(
    State(store): State<OrderStore>,
    Path(order_id): Path<u64>,
) -> Result<Json<Order>, StoreError> {
    counter!("order_service_requests", "route" => "fetch_order").increment(1);
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);

    store.get(order_id).map(Json)
}

/** Throughput logger **/

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);

pub async fn requests_per_second_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = REQUEST_COUNT.swap(0, Ordering::Relaxed);
        if requests > 0 {
            info!("{requests} requests/s");
        }
    }
}
