use crate::ExecutorKind;
use std::fmt;
use std::time::Duration;

/// Run Statistics for a completed Scenario
///
/// Transaction counts and latencies cover every `#[transaction]` call made while the scenario
/// ran; `iterations` counts complete passes through the scenario function.
#[derive(Clone, Debug)]
pub struct RunStatistics {
    pub name: String,
    pub executor: ExecutorKind,
    pub vus: usize,
    pub elapsed: Duration,
    pub iterations: u64,
    /// VUs aborted because the graceful stop expired. A VU runs one iteration at a time, so each
    /// of them left exactly one iteration unfinished.
    pub interrupted: usize,
    pub success: u64,
    pub error: u64,
    pub actual_tps: f64,
    pub error_rate: f64,
    pub latency_p50: Duration,
    pub latency_p90: Duration,
    pub latency_p95: Duration,
    pub latency_p99: Duration,
    pub latency_max: Duration,
}

impl RunStatistics {
    pub fn transactions(&self) -> u64 {
        self.success + self.error
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {} VUs, {}]: iterations={} interrupted={} transactions={} TPS={:.2} ErrorRate={:.4} p50={:?} p90={:?} p95={:?} p99={:?} max={:?}",
            self.name,
            self.executor,
            self.vus,
            humantime::format_duration(truncate_millis(self.elapsed)),
            self.iterations,
            self.interrupted,
            self.transactions(),
            self.actual_tps,
            self.error_rate,
            self.latency_p50,
            self.latency_p90,
            self.latency_p95,
            self.latency_p99,
            self.latency_max,
        )
    }
}

fn truncate_millis(dur: Duration) -> Duration {
    Duration::from_millis(dur.as_millis() as u64)
}
