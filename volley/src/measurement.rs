use pdatastructs::tdigest::{TDigest, K1};
use std::fmt;
use std::time::Duration;
use volley_core::{RunStatistics, ScenarioConfig};

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Raw counters drained from the VU tasks for one sampling interval.
#[derive(Debug, Clone, Default)]
pub(crate) struct Sample {
    pub success: u64,
    pub error: u64,
    pub iterations: u64,
    pub elapsed: Duration,
    pub latency: Vec<Duration>,
}

impl Sample {
    pub fn total(&self) -> u64 {
        self.success + self.error
    }
}

/// Rates and latency quantiles for one sampling interval.
#[derive(Debug, Clone)]
pub(crate) struct Measurement {
    pub tps: f64,
    pub error_rate: f64,
    pub iterations: u64,
    pub elapsed: Duration,
    latency: Latencies,
}

impl Measurement {
    pub fn new(sample: &Sample) -> Self {
        let mut latency = Latencies::new();
        latency.populate(&sample.latency);
        Self {
            tps: rate(sample.total(), sample.elapsed),
            error_rate: error_rate(sample.success, sample.error),
            iterations: sample.iterations,
            elapsed: sample.elapsed,
            latency,
        }
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        self.latency.quantile(quantile)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] TPS={:.2}, ErrorRate={:.2}, Iterations={}, p50={:?}, p90={:?}, p99={:?}",
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64)),
            self.tps,
            self.error_rate,
            self.iterations,
            self.latency(0.5),
            self.latency(0.90),
            self.latency(0.99),
        )
    }
}

/// Accumulates every sample of a run into the final statistics.
#[derive(Debug)]
pub(crate) struct Totals {
    success: u64,
    error: u64,
    iterations: u64,
    latency: Latencies,
}

impl Totals {
    pub fn new() -> Self {
        Self {
            success: 0,
            error: 0,
            iterations: 0,
            latency: Latencies::new(),
        }
    }

    pub fn absorb(&mut self, sample: &Sample) {
        self.success += sample.success;
        self.error += sample.error;
        self.iterations += sample.iterations;
        self.latency.populate(&sample.latency);
    }

    pub fn finish(
        self,
        config: &ScenarioConfig,
        elapsed: Duration,
        interrupted: usize,
    ) -> RunStatistics {
        RunStatistics {
            name: config.name.clone(),
            executor: config.executor(),
            vus: config.vus,
            elapsed,
            iterations: self.iterations,
            interrupted,
            success: self.success,
            error: self.error,
            actual_tps: rate(self.success + self.error, elapsed),
            error_rate: error_rate(self.success, self.error),
            latency_p50: self.latency.quantile(0.5),
            latency_p90: self.latency.quantile(0.9),
            latency_p95: self.latency.quantile(0.95),
            latency_p99: self.latency.quantile(0.99),
            latency_max: self.latency.max,
        }
    }
}

#[derive(Debug, Clone)]
struct Latencies {
    digest: TDigest<K1>,
    count: usize,
    max: Duration,
}

impl Latencies {
    fn new() -> Self {
        Self {
            digest: TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE),
            count: 0,
            max: Duration::ZERO,
        }
    }

    fn populate(&mut self, latencies: &[Duration]) {
        for latency in latencies {
            self.digest.insert(latency.as_secs_f64());
            self.max = self.max.max(*latency);
        }
        self.count += latencies.len();
    }

    fn quantile(&self, quantile: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }

        let secs = self.digest.quantile(quantile);

        // NOTE: TDigest can return NaN on degenerate inputs.
        if secs.is_finite() && secs >= 0. {
            Duration::from_secs_f64(secs)
        } else {
            tracing::error!("Non-finite latency quantile ({secs}); reporting zero.");
            Duration::ZERO
        }
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count as f64 / secs
    } else {
        0.
    }
}

fn error_rate(success: u64, error: u64) -> f64 {
    let total = success + error;
    if total == 0 {
        0.
    } else {
        error as f64 / total as f64
    }
}
