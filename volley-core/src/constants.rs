use std::time::Duration;

/// Number of virtual users a scenario runs with when `.vus()` is not called.
pub const DEFAULT_VUS: usize = 1;

/// Time in-flight iterations get to finish once a scenario is told to stop.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// How often interval measurements are collected and logged.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
