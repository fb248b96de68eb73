#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod scenario;
#[doc(hidden)]
pub mod transaction;

pub(crate) mod measurement;
pub(crate) mod sampler;

pub use scenario::Scenario;
pub use volley_core::{
    generate_labels, ExecutorKind, RunStatistics, ScenarioError, TransactionLabels,
};
pub use volley_macros::{scenario, transaction};

pub mod prelude {
    pub use crate::scenario::ConfigurableScenario;
    pub use volley_macros::{scenario, transaction};

    pub use volley_core::{ExecutorKind, RunStatistics, ScenarioError};
}
