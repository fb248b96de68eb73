use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use order_loadtest::{Options, OptionsError, Summary};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "volley=info,order_loadtest=info";

/// Load test the order service with concurrent order creation (POST) and retrieval (GET).
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// JSON options file (k6-style `scenarios` block). Defaults to the built-in profile.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the order service.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Override the VU count of a scenario, e.g. `--vus get=20`.
    #[arg(long = "vus", value_parser = parse_scenario_vus)]
    vus: Vec<(String, usize)>,

    /// Override the duration of every scenario, e.g. `--duration 1m`.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Read response bodies instead of dropping them.
    #[arg(long)]
    keep_response_bodies: bool,

    /// Only run the named scenario(s).
    #[arg(short, long = "scenario")]
    scenarios: Vec<String>,

    /// Write the end-of-test summary as JSON to this path.
    #[arg(long)]
    summary_export: Option<PathBuf>,

    /// Serve Prometheus metrics on this address while the test runs.
    #[arg(long)]
    prometheus: Option<SocketAddr>,
}

impl Cli {
    fn options(&self) -> Result<Options, OptionsError> {
        let mut options = match &self.config {
            Some(path) => Options::from_file(path)?,
            None => Options::default(),
        };

        if let Some(base_url) = &self.base_url {
            options.base_url = base_url.clone();
        }
        if self.keep_response_bodies {
            options.discard_response_bodies = false;
        }
        if let Some(duration) = self.duration {
            options.set_duration(duration);
        }
        for (name, vus) in &self.vus {
            options.scenario_mut(name)?.vus = *vus;
        }
        if !self.scenarios.is_empty() {
            options.retain(&self.scenarios)?;
        }

        Ok(options)
    }
}

fn parse_scenario_vus(raw: &str) -> Result<(String, usize), String> {
    let (name, vus) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VUS, got `{raw}`"))?;
    let vus = vus
        .parse()
        .map_err(|err| format!("invalid VU count `{vus}`: {err}"))?;
    Ok((name.to_string(), vus))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let options = cli.options()?;

    if let Some(addr) = cli.prometheus {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("Prometheus metrics on {addr}");
    }

    info!("Target: {}", options.base_url);
    let stats = order_loadtest::run(&options).await?;

    for scenario in &stats {
        println!("{scenario}");
    }

    if let Some(path) = &cli.summary_export {
        Summary::new(&stats).write(path)?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vus_override() {
        assert_eq!(parse_scenario_vus("get=20"), Ok(("get".to_string(), 20)));
        assert!(parse_scenario_vus("get").is_err());
        assert!(parse_scenario_vus("get=many").is_err());
    }

    #[test]
    fn cli_overrides_default_options() {
        let cli = Cli::parse_from([
            "order-loadtest",
            "--base-url",
            "http://127.0.0.1:3000",
            "--vus",
            "get=4",
            "--duration",
            "5s",
            "--keep-response-bodies",
            "-s",
            "get",
        ]);

        let options = cli.options().unwrap();
        assert_eq!(options.base_url, "http://127.0.0.1:3000");
        assert!(!options.discard_response_bodies);
        assert_eq!(options.scenarios.len(), 1);
        assert_eq!(options.scenarios["get"].vus, 4);
        assert_eq!(
            options.scenarios["get"].duration,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn cli_rejects_unknown_scenario() {
        let cli = Cli::parse_from(["order-loadtest", "--vus", "put=3"]);
        assert!(matches!(
            cli.options(),
            Err(OptionsError::UnknownScenario(name)) if name == "put"
        ));
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
