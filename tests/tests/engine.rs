use rand::Rng;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use volley::prelude::*;
use volley_tests::base_url;

#[tokio::test]
#[ntest::timeout(30_000)]
async fn per_vu_iterations_against_service() {
    let stats = fetch_seeded_orders().vus(4).iterations(5).await.unwrap();

    assert_eq!(stats.executor, ExecutorKind::PerVuIterations);
    assert_eq!(stats.vus, 4);
    assert_eq!(stats.iterations, 20);
    assert_eq!(stats.success, 20);
    assert_eq!(stats.error, 0);
    assert_eq!(stats.interrupted, 0);
    assert!(stats.latency_max >= stats.latency_p50);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn constant_vus_run_for_duration() {
    let stats = fetch_seeded_orders()
        .vus(3)
        .duration(Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(stats.executor, ExecutorKind::ConstantVus);
    assert_eq!(stats.vus, 3);
    assert!(stats.elapsed >= Duration::from_secs(1));
    assert!(stats.elapsed < Duration::from_secs(5));
    assert!(stats.iterations > 0);
    assert_eq!(stats.error, 0);
    assert!(stats.actual_tps > 0.);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn missing_orders_count_as_errors() {
    let stats = fetch_missing_orders().vus(2).iterations(3).await.unwrap();

    assert_eq!(stats.iterations, 6);
    assert_eq!(stats.success, 0);
    assert_eq!(stats.error, 6);
    assert_eq!(stats.error_rate, 1.);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn tps_cap_is_respected() {
    let stats = fetch_seeded_orders()
        .vus(5)
        .tps(NonZeroU32::new(20).unwrap())
        .duration(Duration::from_secs(1))
        .await
        .unwrap();

    assert!(stats.transactions() > 0);
    assert!(dbg!(stats.transactions()) <= 25);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn scenarios_run_side_by_side() {
    let start = Instant::now();
    let (seeded, missing) = tokio::join!(
        fetch_seeded_orders().vus(2).duration(Duration::from_secs(1)),
        fetch_missing_orders().vus(2).duration(Duration::from_secs(1)),
    );
    let wall = start.elapsed();

    let (seeded, missing) = (seeded.unwrap(), missing.unwrap());
    assert_eq!(seeded.name, "fetch_seeded_orders");
    assert_eq!(missing.name, "fetch_missing_orders");
    assert_eq!(seeded.error, 0);
    assert_eq!(missing.success, 0);
    assert!(dbg!(wall) < Duration::from_secs(3));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let err = fetch_seeded_orders().vus(0).iterations(1).await.unwrap_err();
    assert!(matches!(err, ScenarioError::ZeroVus));

    let err = fetch_seeded_orders().vus(2).await.unwrap_err();
    assert!(matches!(err, ScenarioError::Unbounded));
}

/* Scenario Helpers */

#[scenario]
async fn fetch_seeded_orders() {
    let _ = fetch_seeded().await;
}

#[scenario]
async fn fetch_missing_orders() {
    let _ = fetch_missing().await;
}

#[transaction]
async fn fetch_seeded() -> anyhow::Result<()> {
    let id = rand::thread_rng().gen_range(0..order_service::SEED_ORDER_COUNT);
    get_order(id).await
}

#[transaction]
async fn fetch_missing() -> anyhow::Result<()> {
    get_order(u64::MAX).await
}

async fn get_order(id: u64) -> anyhow::Result<()> {
    reqwest::get(format!("{}/orders/{id}", base_url()))
        .await?
        .error_for_status()?;
    Ok(())
}
