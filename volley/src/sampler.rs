mod task_atomics;
mod timer;

use crate::measurement::Sample;
use crate::transaction::TRANSACTION_HOOK;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use task_atomics::TaskAtomics;
use timer::Timer;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Owns the VU tasks of a scenario and drains their counters once per interval.
pub(crate) struct Sampler<T> {
    name: String,
    scenario: T,
    tasks: Vec<JoinHandle<()>>,
    timer: Timer,
    task_atomics: TaskAtomics,
    stop: Arc<AtomicBool>,
    finished: Finished,
}

impl<T, F> Sampler<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub async fn new(
        name: &str,
        scenario: T,
        interval: Duration,
        max_tps: Option<NonZeroU32>,
    ) -> Self {
        let timer = Timer::new(interval).await;
        trace!("Sampling every {timer}");

        Self {
            name: name.to_string(),
            scenario,
            tasks: vec![],
            timer,
            task_atomics: TaskAtomics::new(max_tps),
            stop: Arc::new(AtomicBool::new(false)),
            finished: Finished::default(),
        }
    }

    /// Start `vus` tasks, each looping the scenario until stopped or until it has completed
    /// `iterations` passes.
    pub fn spawn_vus(&mut self, vus: usize, iterations: Option<u64>) {
        self.finished.active.fetch_add(vus, Ordering::AcqRel);

        for vu in 0..vus {
            let scenario = self.scenario.clone();
            let transaction_data = self.task_atomics.clone_to_transaction_data();
            let iteration_count = self.task_atomics.iterations();
            let stop = self.stop.clone();
            let finished = self.finished.clone();

            self.tasks.push(tokio::spawn(TRANSACTION_HOOK.scope(
                transaction_data,
                async move {
                    let _done = VuGuard { vu, finished };
                    let mut completed = 0u64;
                    while !stop.load(Ordering::Relaxed)
                        && iterations.map_or(true, |max| completed < max)
                    {
                        scenario().await;
                        completed += 1;
                        iteration_count.fetch_add(1, Ordering::Relaxed);
                    }
                    trace!("VU {vu} done after {completed} iterations");
                },
            )));
        }

        #[cfg(feature = "metrics")]
        metrics::gauge!("volley_vus", "scenario" => self.name.clone()).set(self.tasks.len() as f64);

        debug!("{} VUs running for {}", self.tasks.len(), self.name);
    }

    /// Wait out one sampling interval and return what the VUs recorded during it.
    pub async fn sample(&mut self) -> Sample {
        let elapsed = self.timer.tick().await;
        self.task_atomics.collect(elapsed)
    }

    /// Handle resolving once every VU has run out of iterations.
    pub fn finished(&self) -> Finished {
        self.finished.clone()
    }

    #[cfg(test)]
    pub fn concurrency(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every VU to stop after its current iteration, wait up to `graceful_stop` for them,
    /// then abort the rest. Returns the number of interrupted VUs and whatever was recorded since
    /// the last sample.
    pub async fn shutdown(mut self, graceful_stop: Duration) -> (usize, Sample) {
        self.stop.store(true, Ordering::Relaxed);

        let deadline = Instant::now() + graceful_stop;
        let mut interrupted = 0;
        for handle in self.tasks.drain(..) {
            let abort = handle.abort_handle();
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("VU task failed: {err}"),
                Err(_) => {
                    abort.abort();
                    interrupted += 1;
                }
            }
        }

        if interrupted > 0 {
            warn!(
                "{interrupted} VUs of {} did not finish within the graceful stop of {}",
                self.name,
                humantime::format_duration(graceful_stop)
            );
        }

        #[cfg(feature = "metrics")]
        metrics::gauge!("volley_vus", "scenario" => self.name.clone()).set(0.);

        let since_sample = self.timer.last_tick_elapsed();
        (interrupted, self.task_atomics.collect(since_sample))
    }
}

impl<T> Drop for Sampler<T> {
    /// VUs are detached tasks; make sure none outlive a cancelled scenario.
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Counts live VUs and wakes a waiter when the last one exits.
#[derive(Clone, Default)]
pub(crate) struct Finished {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Finished {
    fn vu_done(&self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_one();
        }
    }

    pub async fn wait(&self) {
        if self.active.load(Ordering::Acquire) == 0 {
            return;
        }
        self.notify.notified().await;
    }
}

/// Marks its VU as done when dropped, whether the VU ran out of iterations, panicked or was
/// aborted.
struct VuGuard {
    vu: usize,
    finished: Finished,
}

impl Drop for VuGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("VU {} panicked", self.vu);
        }
        self.finished.vu_done();
    }
}
