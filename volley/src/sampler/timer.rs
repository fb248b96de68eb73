use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

pub(crate) struct Timer {
    interval: Interval,
    last_tick: Instant,
    interval_dur: Duration,
}

impl Timer {
    pub async fn new(interval_dur: Duration) -> Self {
        let mut interval = interval(interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // NOTE: First tick completes instantly
        let last_tick = interval.tick().await;
        Self {
            interval,
            last_tick,
            interval_dur,
        }
    }

    /// Wait for the next tick and return the time since the previous one.
    pub async fn tick(&mut self) -> Duration {
        let next = self.interval.tick().await;
        let elapsed = next.duration_since(self.last_tick);
        self.last_tick = next;
        elapsed
    }

    pub fn last_tick_elapsed(&self) -> Duration {
        self.last_tick.elapsed()
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.interval_dur))
    }
}
