//! Scenario logic and configuration
use crate::measurement::{Measurement, Totals};
use crate::sampler::Sampler;
use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};
use volley_core::{RunStatistics, ScenarioConfig, ScenarioError};

/// Load test scenario structure
///
/// Handler for running scenarios. Use the [`#[scenario]`](volley_macros::scenario) macro to add
/// these methods to plain async functions, or [`Scenario::new`] for closures which capture
/// state (a client, a target URL).
///
/// Awaiting a `Scenario` runs it to completion and resolves to its [`RunStatistics`].
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = Result<RunStatistics, ScenarioError>> + Send>>>,
    config: ScenarioConfig,
}

impl<T> Scenario<T> {
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    type Output = Result<RunStatistics, ScenarioError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let func = this.func.clone();
            let config = this.config.clone();
            Box::pin(async move { run_scenario(func, config).await })
        });

        runner.as_mut().poll(cx)
    }
}

pub trait ConfigurableScenario:
    Future<Output = Result<RunStatistics, ScenarioError>> + Sized + Send
{
    fn vus(self, vus: usize) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn iterations(self, iterations: u64) -> Self;
    fn tps(self, tps: NonZeroU32) -> Self;
    fn graceful_stop(self, graceful_stop: Duration) -> Self;
    fn sample_interval(self, interval: Duration) -> Self;

    /// Check the configuration without running anything. Awaiting the scenario performs the same
    /// check before any VU starts.
    fn validate(&self) -> Result<(), ScenarioError>;
}

impl<T, F> ConfigurableScenario for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    /// Run the scenario with a fixed number of virtual users.
    ///
    /// NOTE: Must supply a `.duration()` and/or `.iterations()` as well
    ///
    /// # Example
    /// ```no_run
    /// use volley::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let stats = my_scenario()
    ///         .vus(10)
    ///         .duration(Duration::from_secs(30))
    ///         .await
    ///         .unwrap();
    ///     println!("{stats}");
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn vus(mut self, vus: usize) -> Self {
        self.config.vus = vus;
        self
    }

    /// Run the scenario for the given wall-clock duration.
    ///
    /// Combined with `.iterations()`, the duration caps how long the VUs may take.
    fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = Some(duration);
        self
    }

    /// Have every VU run the scenario exactly `iterations` times, then stop.
    ///
    /// # Example
    /// ```no_run
    /// use volley::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     // 4 VUs x 25 iterations = 100 iterations in total
    ///     my_scenario()
    ///         .vus(4)
    ///         .iterations(25)
    ///         .await
    ///         .unwrap();
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn iterations(mut self, iterations: u64) -> Self {
        self.config.iterations = Some(iterations);
        self
    }

    /// Cap the rate of transactions across all VUs of this scenario.
    fn tps(mut self, tps: NonZeroU32) -> Self {
        self.config.max_tps = Some(tps);
        self
    }

    /// Time in-flight iterations get to complete once the scenario ends (default 30s).
    /// Iterations still running afterwards are aborted and reported as interrupted.
    fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.config.graceful_stop = graceful_stop;
        self
    }

    fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval = interval;
        self
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()
    }
}

#[instrument(name="scenario", skip_all, fields(name=config.name))]
pub(crate) async fn run_scenario<T, F>(
    scenario: T,
    config: ScenarioConfig,
) -> Result<RunStatistics, ScenarioError>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    info!("Running {} with config {:?}", config.name, &config);

    let start = Instant::now();
    let deadline = config.duration.map(|duration| start + duration);

    let mut sampler = Sampler::new(
        &config.name,
        scenario,
        config.sample_interval,
        config.max_tps,
    )
    .await;
    sampler.spawn_vus(config.vus, config.iterations);
    let finished = sampler.finished();

    // NOTE: This loop is time-sensitive. Any long awaits or blocking will throw off measurements
    let mut totals = Totals::new();
    loop {
        tokio::select! {
            sample = sampler.sample() => {
                info!("{}", Measurement::new(&sample));
                totals.absorb(&sample);
            }
            _ = finished.wait() => {
                debug!("All VUs completed their iterations.");
                break;
            }
            _ = sleep_until(deadline) => {
                debug!("Scenario duration elapsed.");
                break;
            }
        }
    }

    let (interrupted, rest) = sampler.shutdown(config.graceful_stop).await;
    totals.absorb(&rest);

    let stats = totals.finish(&config, start.elapsed(), interrupted);
    info!("Scenario complete: {stats}");

    Ok(stats)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
