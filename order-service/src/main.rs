use metrics_exporter_prometheus::PrometheusBuilder;
use order_service::{
    requests_per_second_task, serve, OrderStore, SEED_ORDER_COUNT, SNAPSHOT_COMMAND_COUNT,
};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DATA_DIR: &str = "./data";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("order_service=info,tower_http=info")),
        )
        .init();

    let instant = Instant::now();

    let addr: SocketAddr = std::env::var("ORDER_SERVICE_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;

    if let Ok(metrics_addr) = std::env::var("ORDER_SERVICE_METRICS_ADDR") {
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr.parse::<SocketAddr>()?)
            .install()?;
        info!("Prometheus metrics on {metrics_addr}");
    }

    let data_dir =
        std::env::var("ORDER_SERVICE_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let store = OrderStore::open(&data_dir, SNAPSHOT_COMMAND_COUNT)?;
    info!("Startup: {}ms", instant.elapsed().as_millis());
    info!("{} orders in db", store.len()?);

    if store.seed_test_orders(SEED_ORDER_COUNT)? {
        info!("Inserted test-data");
    }

    tokio::spawn(requests_per_second_task());
    let listener = TcpListener::bind(addr).await?;

    serve(listener, store).await
}
