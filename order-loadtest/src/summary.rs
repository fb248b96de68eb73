//! End-of-test summary export.
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use volley::RunStatistics;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub scenarios: BTreeMap<String, ScenarioSummary>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    pub executor: String,
    pub vus: usize,
    pub elapsed_ms: f64,
    pub iterations: u64,
    pub interrupted_iterations: usize,
    pub transactions: u64,
    pub success: u64,
    pub error: u64,
    pub error_rate: f64,
    pub tps: f64,
    pub latency_ms: LatencySummary,
}

#[derive(Debug, Serialize)]
pub struct LatencySummary {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl Summary {
    pub fn new(stats: &[RunStatistics]) -> Self {
        let scenarios = stats
            .iter()
            .map(|s| {
                let summary = ScenarioSummary {
                    executor: s.executor.to_string(),
                    vus: s.vus,
                    elapsed_ms: millis(s.elapsed),
                    iterations: s.iterations,
                    interrupted_iterations: s.interrupted,
                    transactions: s.transactions(),
                    success: s.success,
                    error: s.error,
                    error_rate: s.error_rate,
                    tps: s.actual_tps,
                    latency_ms: LatencySummary {
                        p50: millis(s.latency_p50),
                        p90: millis(s.latency_p90),
                        p95: millis(s.latency_p95),
                        p99: millis(s.latency_p99),
                        max: millis(s.latency_max),
                    },
                };
                (s.name.clone(), summary)
            })
            .collect();

        Self { scenarios }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let raw = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

fn millis(dur: Duration) -> f64 {
    dur.as_nanos() as f64 / 1e6
}
