//! Shared harness for the integration tests: one in-process order service per test binary.
use order_service::{OrderStore, SEED_ORDER_COUNT};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::error;

/// Start the order service (once) and return its address.
///
/// The service runs on its own thread and runtime, since every `#[tokio::test]` gets a fresh
/// runtime which is torn down when the test ends.
pub fn init() -> SocketAddr {
    static SERVICE: OnceLock<SocketAddr> = OnceLock::new();

    *SERVICE.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("volley=debug,order_loadtest=debug,order_service=info")
            .with_test_writer()
            .try_init();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                let store = OrderStore::with_test_orders(SEED_ORDER_COUNT).unwrap();
                if let Err(err) = order_service::serve(listener, store).await {
                    error!("Order service stopped: {err}");
                }
            });
        });

        addr
    })
}

pub fn base_url() -> String {
    format!("http://{}", init())
}
