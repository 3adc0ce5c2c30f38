// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! WattState - device operating-state inference from energy telemetry
//!
//! Reads raw points and rules as JSON files, writes results as JSON to
//! stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wattstate::{Config, Engine, Rule, Sample, VERSION};

/// WattState - device state inference from energy telemetry
#[derive(Parser, Debug)]
#[command(name = "wattstate")]
#[command(version = VERSION)]
#[command(about = "Infer device operating states from energy telemetry")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a rule over a device's history
    Simulate {
        /// JSON array of points
        #[arg(long)]
        points: PathBuf,

        /// JSON rule document
        #[arg(long)]
        rule: PathBuf,

        /// Metric name for flat `{ts, value}` points (defaults to the rule's metric)
        #[arg(long)]
        metric: Option<String>,
    },

    /// Propose a rule from a device's history
    Propose {
        #[arg(long)]
        points: PathBuf,

        /// Device type used to pick the template
        #[arg(long, default_value = "other")]
        device_type: String,

        #[arg(long, default_value = "watts")]
        metric: String,
    },

    /// Report the current state over the trailing status window
    Status {
        #[arg(long)]
        points: PathBuf,

        #[arg(long)]
        rule: Option<PathBuf>,

        /// Evaluation time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        #[arg(long)]
        metric: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// Also save it to the configuration path
        #[arg(long)]
        write: bool,
    },
}

/// Accepted point shapes: a full sample, or a flat single-metric reading.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointRecord {
    Sample(Sample),
    Flat { ts: DateTime<Utc>, value: Option<f64> },
}

impl PointRecord {
    fn into_sample(self, metric: &str) -> Sample {
        match self {
            PointRecord::Sample(sample) => sample,
            PointRecord::Flat { ts, value } => Sample::single(ts, metric, value),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {:?}", config_path))?;

    init_logging(&args, &config)?;
    info!("WattState v{}", VERSION);
    debug!("Configuration path {:?}", config_path);

    let engine = Engine::new(config);

    match args.command {
        Command::Simulate { points, rule, metric } => {
            let rule = read_rule(&rule)?;
            let metric = metric.unwrap_or_else(|| rule.metric().to_string());
            let points = read_points(&points, &metric)?;
            print_json(&engine.simulate(&points, &rule))
        }
        Command::Propose {
            points,
            device_type,
            metric,
        } => {
            let points = read_points(&points, &metric)?;
            let proposal = engine
                .propose(&points, &device_type, &metric)
                .with_context(|| format!("proposing rule for {}", device_type))?;
            print_json(&proposal)
        }
        Command::Status {
            points,
            rule,
            now,
            metric,
        } => {
            let rule = rule.as_deref().map(read_rule).transpose()?;
            let metric = metric
                .or_else(|| rule.as_ref().map(|r| r.metric().to_string()))
                .unwrap_or_else(|| "watts".to_string());
            let points = read_points(&points, &metric)?;
            let now = now.unwrap_or_else(Utc::now);
            print_json(&engine.status(&points, rule.as_ref(), now))
        }
        Command::Config { write } => {
            if write {
                engine.config.save(&config_path)?;
            }
            print!("{}", engine.config.to_toml()?);
            Ok(())
        }
    }
}

/// RUST_LOG wins, then the flags, then the configured level.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if args.trace {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn read_points(path: &Path, metric: &str) -> Result<Vec<Sample>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading points from {:?}", path))?;
    let records: Vec<PointRecord> =
        serde_json::from_str(&content).with_context(|| format!("parsing points from {:?}", path))?;
    debug!("Read {} points from {:?}", records.len(), path);
    Ok(records.into_iter().map(|r| r.into_sample(metric)).collect())
}

fn read_rule(path: &Path) -> Result<Rule> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading rule from {:?}", path))?;
    let rule = Rule::from_json(&content).with_context(|| format!("invalid rule in {:?}", path))?;
    Ok(rule)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
