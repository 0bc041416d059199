use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tether_core::config::{self, EngineConfig};
use tether_core::TrimPolicy;

use crate::error::{DemoError, Result};
use crate::scenarios;

#[derive(Debug, Parser)]
#[command(
    name = "tether-demo",
    about = "Walk through tether listener dispatch, weak listeners and short-circuit bindings",
    version
)]
pub struct Cli {
    /// Trim policy for Generic registries: `reclaim` or `legacy`.
    /// Overrides TETHER_TRIM_POLICY.
    #[arg(long, global = true)]
    pub trim_policy: Option<String>,

    /// Log filter directive, e.g. `tether_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Add and remove listeners while a notification is running.
    Dispatch,

    /// Show which operand changes reach AND / OR bindings.
    #[command(name = "short-circuit")]
    ShortCircuit,

    /// Drop the target of a weak listener and watch it unregister.
    Weak,

    /// Route failing listeners to the observable:error hook.
    Failures,
}

impl Commands {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::ShortCircuit => "short-circuit",
            Self::Weak => "weak",
            Self::Failures => "failures",
        }
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref())?;
    for line in run(&cli)? {
        println!("{line}");
    }
    Ok(())
}

/// Resolve the engine configuration: environment first, flags on top.
pub fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env()?;
    if let Some(raw) = cli.trim_policy.as_deref() {
        config = config.with_trim_policy(raw.parse::<TrimPolicy>()?);
    }
    Ok(config)
}

/// Run the selected scenario and return its report.
pub fn run(cli: &Cli) -> Result<Vec<String>> {
    let _config = config::install(engine_config(cli)?);
    let scenario = cli.command;
    tracing::debug!(scenario = scenario.name(), "running scenario");
    match scenario {
        Commands::Dispatch => scenarios::dispatch(),
        Commands::ShortCircuit => scenarios::short_circuit(),
        Commands::Weak => scenarios::weak(),
        Commands::Failures => scenarios::failures(),
    }
}

fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn")),
    }
    .map_err(|err| DemoError::Logging {
        message: err.to_string(),
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| DemoError::Logging {
            message: err.to_string(),
        })
}
