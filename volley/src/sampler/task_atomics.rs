use crate::measurement::Sample;
use crate::transaction::TransactionData;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics_util::AtomicBucket;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters shared between the sampler and every VU task of one scenario.
pub(crate) struct TaskAtomics {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    success: Arc<AtomicU64>,
    error: Arc<AtomicU64>,
    iterations: Arc<AtomicU64>,
    latency: Arc<AtomicBucket<Duration>>,
}

impl TaskAtomics {
    pub fn new(max_tps: Option<NonZeroU32>) -> Self {
        Self {
            limiter: max_tps.map(|tps| Arc::new(rate_limiter(tps))),
            success: Arc::new(AtomicU64::new(0)),
            error: Arc::new(AtomicU64::new(0)),
            iterations: Arc::new(AtomicU64::new(0)),
            latency: Arc::new(AtomicBucket::new()),
        }
    }

    pub fn clone_to_transaction_data(&self) -> TransactionData {
        TransactionData {
            limiter: self.limiter.clone(),
            success: self.success.clone(),
            error: self.error.clone(),
            latency: self.latency.clone(),
        }
    }

    pub fn iterations(&self) -> Arc<AtomicU64> {
        self.iterations.clone()
    }

    /// Drain everything recorded since the previous call.
    pub fn collect(&self, elapsed: Duration) -> Sample {
        let success = self.success.swap(0, Ordering::Relaxed);
        let error = self.error.swap(0, Ordering::Relaxed);
        let iterations = self.iterations.swap(0, Ordering::Relaxed);
        let mut latency = vec![];
        self.latency.clear_with(|dur| latency.extend_from_slice(dur));

        Sample {
            success,
            error,
            iterations,
            elapsed,
            latency,
        }
    }
}

fn rate_limiter(tps_limit: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps_limit).allow_burst(NonZeroU32::MIN))
}
