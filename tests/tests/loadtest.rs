use order_loadtest::options::{Exec, ScenarioOptions};
use order_loadtest::payload::{order_url, orders_url, NewOrder};
use order_loadtest::{Options, Summary};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use volley::ExecutorKind;
use volley_tests::base_url;

fn options(scenarios: impl IntoIterator<Item = (&'static str, ScenarioOptions)>) -> Options {
    Options {
        base_url: base_url(),
        discard_response_bodies: true,
        scenarios: scenarios
            .into_iter()
            .map(|(name, scenario)| (name.to_string(), scenario))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn order_profile_runs_both_scenarios() {
    let options = options([
        (
            "post",
            ScenarioOptions::constant_vus(Exec::Post, 2, Duration::from_secs(1)),
        ),
        (
            "get",
            ScenarioOptions::constant_vus(Exec::Get, 10, Duration::from_secs(1)),
        ),
    ]);

    let stats = order_loadtest::run(&options).await.unwrap();
    assert_eq!(stats.len(), 2);

    let (get, post) = (&stats[0], &stats[1]);
    assert_eq!(get.name, "get");
    assert_eq!(get.vus, 10);
    assert_eq!(get.executor, ExecutorKind::ConstantVus);
    assert!(get.transactions() > 0);
    // Ids are drawn from [0, 100_000) but only 0..120 are seeded.
    assert!(get.error > 0);

    assert_eq!(post.name, "post");
    assert_eq!(post.vus, 2);
    assert!(post.transactions() > 0);
    assert_eq!(post.error, 0);
    assert!(post.elapsed >= Duration::from_secs(1));
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn per_vu_iterations_with_bodies_kept() {
    let mut options = options([
        ("post", ScenarioOptions::per_vu_iterations(Exec::Post, 2, 10)),
        ("get", ScenarioOptions::per_vu_iterations(Exec::Get, 3, 10)),
    ]);
    options.discard_response_bodies = false;

    let stats = order_loadtest::run(&options).await.unwrap();

    let (get, post) = (&stats[0], &stats[1]);
    assert_eq!(get.executor, ExecutorKind::PerVuIterations);
    assert_eq!(get.iterations, 30);
    assert_eq!(get.transactions(), 30);
    assert_eq!(post.iterations, 20);
    assert_eq!(post.success, 20);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn unreachable_service_counts_errors() {
    let mut options = options([("get", ScenarioOptions::per_vu_iterations(Exec::Get, 1, 3))]);
    options.base_url = "http://127.0.0.1:1".to_string();

    let stats = order_loadtest::run(&options).await.unwrap();
    assert_eq!(stats[0].iterations, 3);
    assert_eq!(stats[0].error, 3);
    assert_eq!(stats[0].error_rate, 1.);
}

#[tokio::test]
async fn invalid_options_are_rejected_before_running() {
    let mut options = options([("get", ScenarioOptions::per_vu_iterations(Exec::Get, 1, 1))]);
    options.scenarios.clear();
    assert!(order_loadtest::run(&options).await.is_err());
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn error_statuses_count_as_failures() {
    for discard_response_bodies in [true, false] {
        let mut options = options([
            ("post", ScenarioOptions::per_vu_iterations(Exec::Post, 2, 4)),
            ("get", ScenarioOptions::per_vu_iterations(Exec::Get, 2, 4)),
        ]);
        // Nothing is routed under this prefix, so every request gets a 404.
        options.base_url = format!("{}/missing", base_url());
        options.discard_response_bodies = discard_response_bodies;

        let stats = order_loadtest::run(&options).await.unwrap();
        for scenario in &stats {
            assert_eq!(scenario.iterations, 8, "{scenario}");
            assert_eq!(scenario.success, 0, "{scenario}");
            assert_eq!(scenario.error, 8, "{scenario}");
        }
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn zero_vus_rejects_the_whole_run() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let accepted = connections.clone();
    let acceptor = tokio::spawn(async move {
        while let Ok((_socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::Relaxed);
        }
    });

    let mut options = options([
        (
            "post",
            ScenarioOptions::constant_vus(Exec::Post, 1, Duration::from_secs(2)),
        ),
        (
            "get",
            ScenarioOptions::constant_vus(Exec::Get, 0, Duration::from_secs(2)),
        ),
    ]);
    options.base_url = format!("http://{addr}");

    let err = order_loadtest::run(&options).await.unwrap_err();
    assert!(err.to_string().contains("get"), "{err}");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(connections.load(Ordering::Relaxed), 0);
    acceptor.abort();
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn summary_export_is_written() {
    let options = options([("post", ScenarioOptions::per_vu_iterations(Exec::Post, 1, 5))]);
    let stats = order_loadtest::run(&options).await.unwrap();

    let path = std::env::temp_dir().join(format!("order-loadtest-{}.json", std::process::id()));
    Summary::new(&stats).write(&path).unwrap();

    let json: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    let post = &json["scenarios"]["post"];
    assert_eq!(post["executor"], Value::from("per-vu-iterations"));
    assert_eq!(post["iterations"], Value::from(5));
    assert_eq!(post["success"], Value::from(5));
    assert_eq!(post["interrupted_iterations"], Value::from(0));
}

#[tokio::test]
async fn created_order_can_be_fetched() {
    let base_url = base_url();
    let client = reqwest::Client::new();
    let order = NewOrder::random(&mut rand::thread_rng());

    let res = client
        .post(orders_url(&base_url))
        .json(&order)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let fetched: Value = client
        .get(order_url(&base_url, order.order_id))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(fetched["order_id"], Value::from(order.order_id));
    assert_eq!(fetched["name"], Value::from(order.name));
    assert_eq!(fetched["transport_id"], Value::from(order.transport_id));
}

#[cfg(feature = "integration")]
mod integration {
    use super::*;

    /// The full default profile: 2 VUs posting and 10 VUs fetching for 30 seconds.
    #[tokio::test]
    #[ntest::timeout(120_000)]
    async fn default_profile() {
        let options = Options {
            base_url: base_url(),
            ..Options::default()
        };

        let stats = order_loadtest::run(&options).await.unwrap();
        for scenario in &stats {
            println!("{scenario}");
            assert!(scenario.elapsed >= Duration::from_secs(30));
        }

        assert_eq!(stats[0].vus, 10);
        assert_eq!(stats[1].vus, 2);
        assert_eq!(stats[1].error, 0);
    }
}
