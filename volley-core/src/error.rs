use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Scenario needs at least one virtual user.")]
    ZeroVus,

    #[error("Scenario has neither a duration nor an iteration count; it would never stop.")]
    Unbounded,

    #[error("Scenario duration must be greater than zero.")]
    ZeroDuration,

    #[error("Per-VU iteration count must be greater than zero.")]
    ZeroIterations,

    #[error("Sample interval must be greater than zero.")]
    ZeroSampleInterval,
}
