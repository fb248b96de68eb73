//! Load test options: which scenarios to run, against what, and for how long.
//!
//! Options can be read from a JSON file shaped like the options block of a k6 script:
//!
//! ```json
//! {
//!   "baseUrl": "http://localhost:8080",
//!   "discardResponseBodies": true,
//!   "scenarios": {
//!     "post": { "exec": "POST", "executor": "constant-vus", "vus": 2, "duration": "30s" },
//!     "get": { "exec": "GET", "executor": "constant-vus", "vus": 10, "duration": "30s" }
//!   }
//! }
//! ```
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Unable to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No scenarios configured.")]
    NoScenarios,

    #[error("Unknown scenario `{0}`.")]
    UnknownScenario(String),

    #[error("Scenario `{0}` needs at least one virtual user.")]
    ZeroVus(String),

        #[error("Scenario `{0}` uses the constant-vus executor but has no duration.")]
    MissingDuration(String),

    #[error("Scenario `{0}` uses the per-vu-iterations executor but has no iteration count.")]
    MissingIterations(String),
}

/// Which request function a scenario runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exec {
    /// Create a random order.
    Post,
    /// Fetch a random order id.
    Get,
}

impl fmt::Display for Exec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exec::Post => write!(f, "POST"),
            Exec::Get => write!(f, "GET"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Executor {
    ConstantVus,
    PerVuIterations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOptions {
    pub exec: Exec,
    pub executor: Executor,
    #[serde(default = "default_vus")]
    pub vus: usize,
    #[serde(default, with = "humantime_opt")]
    pub duration: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tps: Option<NonZeroU32>,
    #[serde(default, with = "humantime_opt")]
    pub graceful_stop: Option<Duration>,
}

impl ScenarioOptions {
    pub fn constant_vus(exec: Exec, vus: usize, duration: Duration) -> Self {
        Self {
            exec,
            executor: Executor::ConstantVus,
            vus,
            duration: Some(duration),
            iterations: None,
            max_tps: None,
            graceful_stop: None,
        }
    }

    pub fn per_vu_iterations(exec: Exec, vus: usize, iterations: u64) -> Self {
        Self {
            exec,
            executor: Executor::PerVuIterations,
            vus,
            duration: None,
            iterations: Some(iterations),
            max_tps: None,
            graceful_stop: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_discard")]
    pub discard_response_bodies: bool,
    pub scenarios: BTreeMap<String, ScenarioOptions>,
}

impl Default for Options {
    /// Two constant-vus scenarios for 30s each: `post` with 2 VUs creating orders, `get` with 10
    /// VUs fetching them. Response bodies are discarded.
    fn default() -> Self {
        let duration = Duration::from_secs(30);
        Self {
            base_url: default_base_url(),
            discard_response_bodies: true,
            scenarios: BTreeMap::from([
                (
                    "post".to_string(),
                    ScenarioOptions::constant_vus(Exec::Post, 2, duration),
                ),
                (
                    "get".to_string(),
                    ScenarioOptions::constant_vus(Exec::Get, 10, duration),
                ),
            ]),
        }
    }
}

impl Options {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_json::from_str(raw)?;
        options.validate()?;
        Ok(options)
    }

    /// Check every scenario has a VU and carries the bound its executor needs.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.scenarios.is_empty() {
            return Err(OptionsError::NoScenarios);
        }

        for (name, scenario) in &self.scenarios {
            if scenario.vus == 0 {
                return Err(OptionsError::ZeroVus(name.clone()));
            }
            match scenario.executor {
                Executor::ConstantVus if scenario.duration.is_none() => {
                    return Err(OptionsError::MissingDuration(name.clone()))
                }
                Executor::PerVuIterations if scenario.iterations.is_none() => {
                    return Err(OptionsError::MissingIterations(name.clone()))
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn scenario_mut(&mut self, name: &str) -> Result<&mut ScenarioOptions, OptionsError> {
        self.scenarios
            .get_mut(name)
            .ok_or_else(|| OptionsError::UnknownScenario(name.to_string()))
    }

    /// Override the duration of every scenario.
    pub fn set_duration(&mut self, duration: Duration) {
        for scenario in self.scenarios.values_mut() {
            scenario.duration = Some(duration);
        }
    }

    /// Keep only the named scenarios.
    pub fn retain(&mut self, names: &[String]) -> Result<(), OptionsError> {
        if let Some(unknown) = names.iter().find(|n| !self.scenarios.contains_key(*n)) {
            return Err(OptionsError::UnknownScenario(unknown.clone()));
        }
        self.scenarios.retain(|name, _| names.contains(name));
        Ok(())
    }
}

fn default_vus() -> usize {
    1
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_discard() -> bool {
    true
}

/// Durations written the humantime way, e.g. `"30s"` or `"1m 30s"`.
mod humantime_opt {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => ser.collect_str(&humantime::format_duration(*duration)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(de)?
            .map(|raw| humantime::parse_duration(&raw).map_err(D::Error::custom))
            .transpose()
    }
}
