use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use coralai_app::{AppConfig, ConfigOverride, Session};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "coralai",
    version,
    about = "Run a coral organism over a toroidal channel world"
)]
struct Cli {
    /// JSON config file; defaults are used for anything it omits.
    #[arg(short, long, env = "CORALAI_CONFIG")]
    config: Option<PathBuf>,
    /// Number of steps to run.
    #[arg(long)]
    steps: Option<u64>,
    /// Seed for weights and entropy noise.
    #[arg(long)]
    seed: Option<u64>,
    /// Perturb weights every N steps.
    #[arg(long)]
    perturb_every: Option<u64>,
    /// Strength of each weight perturbation.
    #[arg(long)]
    perturb_strength: Option<f32>,
    /// Dotted-path override such as `world.width=64` (repeatable).
    #[arg(long = "set", value_name = "PATH=VALUE")]
    overrides: Vec<String>,
    /// Write the final run report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut session = Session::new(config).context("failed to set up session")?;
    let report = session.run().context("run failed")?;
    info!(
        steps = report.steps,
        summaries = report.summaries.len(),
        "run complete"
    );

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(steps) = cli.steps {
        config.run.steps = steps;
    }
    if let Some(seed) = cli.seed {
        config.organism.rng_seed = Some(seed);
    }
    if let Some(interval) = cli.perturb_every {
        config.run.perturb_interval = Some(interval);
    }
    if let Some(strength) = cli.perturb_strength {
        config.run.perturb_strength = strength;
    }
    let overrides = cli
        .overrides
        .iter()
        .map(|raw| raw.parse::<ConfigOverride>())
        .collect::<Result<Vec<_>, _>>()?;
    let config = config.with_overrides(&overrides)?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
