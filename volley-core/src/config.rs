use crate::{ScenarioError, DEFAULT_GRACEFUL_STOP, DEFAULT_SAMPLE_INTERVAL, DEFAULT_VUS};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// How virtual users are scheduled for a scenario.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutorKind {
    /// A fixed number of VUs loop the scenario until the duration elapses.
    ConstantVus,
    /// Every VU runs the scenario a fixed number of times. A duration, if set, caps the run.
    PerVuIterations,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::ConstantVus => write!(f, "constant-vus"),
            ExecutorKind::PerVuIterations => write!(f, "per-vu-iterations"),
        }
    }
}

#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub name: String,
    pub vus: usize,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
    pub max_tps: Option<NonZeroU32>,
    pub graceful_stop: Duration,
    pub sample_interval: Duration,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vus: DEFAULT_VUS,
            duration: None,
            iterations: None,
            max_tps: None,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn executor(&self) -> ExecutorKind {
        if self.iterations.is_some() {
            ExecutorKind::PerVuIterations
        } else {
            ExecutorKind::ConstantVus
        }
    }

    /// Check the config describes a run that can start and will end.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.vus == 0 {
            return Err(ScenarioError::ZeroVus);
        }

        match (self.duration, self.iterations) {
            (None, None) => Err(ScenarioError::Unbounded),
            (Some(duration), _) if duration.is_zero() => Err(ScenarioError::ZeroDuration),
            (_, Some(0)) => Err(ScenarioError::ZeroIterations),
            _ if self.sample_interval.is_zero() => Err(ScenarioError::ZeroSampleInterval),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded() {
        let config = ScenarioConfig::new("post");
        assert_eq!(config.vus, DEFAULT_VUS);
        assert_eq!(config.executor(), ExecutorKind::ConstantVus);
        assert!(matches!(config.validate(), Err(ScenarioError::Unbounded)));
    }

    #[test]
    fn duration_bound_is_constant_vus() {
        let mut config = ScenarioConfig::new("get");
        config.vus = 10;
        config.duration = Some(Duration::from_secs(30));
        assert_eq!(config.executor(), ExecutorKind::ConstantVus);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn iterations_select_per_vu_executor() {
        let mut config = ScenarioConfig::new("get");
        config.iterations = Some(5);
        assert_eq!(config.executor(), ExecutorKind::PerVuIterations);
        assert!(config.validate().is_ok());

        config.duration = Some(Duration::from_secs(1));
        assert_eq!(config.executor(), ExecutorKind::PerVuIterations);
    }

    #[test]
    fn rejects_degenerate_configs() {
        let mut config = ScenarioConfig::new("post");
        config.duration = Some(Duration::from_secs(1));

        config.vus = 0;
        assert!(matches!(config.validate(), Err(ScenarioError::ZeroVus)));

        config.vus = 2;
        config.duration = Some(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ScenarioError::ZeroDuration)));

        config.duration = None;
        config.iterations = Some(0);
        assert!(matches!(config.validate(), Err(ScenarioError::ZeroIterations)));

        config.iterations = Some(1);
        config.sample_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ScenarioError::ZeroSampleInterval)
        ));
    }

    #[test]
    fn executor_display() {
        assert_eq!(ExecutorKind::ConstantVus.to_string(), "constant-vus");
        assert_eq!(
            ExecutorKind::PerVuIterations.to_string(),
            "per-vu-iterations"
        );
    }
}
