//! The order scenarios and the transactions they issue.
use crate::options::{Exec, Executor, Options, ScenarioOptions};
use crate::payload::{order_url, orders_url, random_order_id, NewOrder};
use anyhow::{bail, Context};
use reqwest::{header::CONTENT_TYPE, Client, Response};
use tracing::{debug, info, Instrument};
use volley::prelude::*;
use volley::Scenario;

/// Where and how requests are sent. Cheap to clone; every VU holds one.
#[derive(Clone, Debug)]
pub struct Target {
    client: Client,
    base_url: String,
    discard_response_bodies: bool,
}

impl Target {
    pub fn new(client: Client, base_url: &str, discard_response_bodies: bool) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            discard_response_bodies,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drain (or drop) the body and turn error statuses into transaction failures.
    async fn complete(&self, res: Response) -> anyhow::Result<()> {
        let status = res.status();
        if !self.discard_response_bodies {
            res.bytes().await?;
        }

        if status.is_client_error() || status.is_server_error() {
            bail!("{status}");
        }
        Ok(())
    }
}

/// POST a randomly generated order.
#[transaction]
pub async fn create_order(target: &Target) -> anyhow::Result<()> {
    let body = NewOrder::random(&mut rand::thread_rng()).to_body()?;
    let res = target
        .client
        .post(orders_url(&target.base_url))
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;
    target.complete(res).await
}

/// GET a random order id.
#[transaction]
pub async fn fetch_order(target: &Target) -> anyhow::Result<()> {
    let url = order_url(&target.base_url, random_order_id(&mut rand::thread_rng()));
    let res = target.client.get(url).send().await?;
    target.complete(res).await
}

/// Build the volley scenario described by `options`, issuing its requests against `target`.
pub fn build(name: &str, options: &ScenarioOptions, target: Target) -> impl ConfigurableScenario {
    let exec = options.exec;
    let scenario = Scenario::new(name, move || {
        let target = target.clone();
        async move {
            let res = match exec {
                Exec::Post => create_order(&target).await,
                Exec::Get => fetch_order(&target).await,
            };
            if let Err(err) = res {
                debug!("{exec} failed: {err}");
            }
        }
    });

    configure(scenario, options)
}

/// Apply VU count, bounds, TPS cap and graceful stop from `options`.
pub fn configure<S: ConfigurableScenario>(scenario: S, options: &ScenarioOptions) -> S {
    let mut scenario = scenario.vus(options.vus);

    if let Some(duration) = options.duration {
        scenario = scenario.duration(duration);
    }
    if let (Executor::PerVuIterations, Some(iterations)) = (options.executor, options.iterations)
    {
        scenario = scenario.iterations(iterations);
    }
    if let Some(max_tps) = options.max_tps {
        scenario = scenario.tps(max_tps);
    }
    if let Some(graceful_stop) = options.graceful_stop {
        scenario = scenario.graceful_stop(graceful_stop);
    }

    scenario
}

/// Run every configured scenario concurrently and collect their statistics in name order.
///
/// Every scenario is validated before the first one starts. If one of them fails anyway, the
/// others are aborted rather than left running against the target.
pub async fn run(options: &Options) -> anyhow::Result<Vec<RunStatistics>> {
    options.validate()?;

    let client = Client::builder().build()?;
    let mut scenarios = Vec::with_capacity(options.scenarios.len());
    for (name, scenario) in &options.scenarios {
        let target = Target::new(
            client.clone(),
            &options.base_url,
            options.discard_response_bodies,
        );
        let built = build(name, scenario, target);
        built
            .validate()
            .with_context(|| format!("invalid scenario `{name}`"))?;
        scenarios.push((name, scenario, built));
    }

    let mut handles = vec![];
    for (name, scenario, built) in scenarios {
        info!(
            "Scheduling {name}: {} with {} VUs",
            scenario.exec, scenario.vus
        );
        handles.push(tokio::spawn(built.in_current_span()));
    }

    let mut stats = Vec::with_capacity(handles.len());
    let mut handles = handles.into_iter();
    while let Some(handle) = handles.next() {
        let res = match handle.await {
            Ok(res) => res.map_err(anyhow::Error::from),
            Err(err) => Err(err.into()),
        };

        match res {
            Ok(scenario) => stats.push(scenario),
            Err(err) => {
                for rest in handles.by_ref() {
                    rest.abort();
                }
                return Err(err);
            }
        }
    }
    Ok(stats)
}
