//! Cloud Impact Estimator CLI
//!
//! Estimates the energy, carbon, water and cost footprint of cloud usage
//! and compares the same workload across regions or resource classes.

mod commands;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{compare, estimate, list, UsageArgs};
use impact_engine::{EngineConfig, EngineMetrics, ImpactEngine, RankingMetric, ReferenceStore, ServiceType};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cloud Impact Estimator CLI
#[derive(Parser)]
#[command(name = "cimpact")]
#[command(author, version, about = "Environmental impact estimates for cloud usage", long_about = None)]
pub struct Cli {
    /// Directory holding the reference tables (overrides the config file)
    #[arg(long, env = "IMPACT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Region used when a requested region is unknown
    #[arg(long, global = true)]
    pub default_region: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print engine metrics after the command
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the impact of one usage record
    Estimate {
        /// Service type (compute, object-storage, relational-storage, model-inference)
        #[arg(long, short)]
        service: ServiceType,

        /// Instance type, storage class or model id
        #[arg(long, short)]
        resource: String,

        /// Region code
        #[arg(long, short = 'g')]
        region: String,

        #[command(flatten)]
        usage: UsageArgs,
    },

    /// Rank the same workload across candidates
    #[command(subcommand)]
    Compare(CompareCommands),

    /// List reference data
    #[command(subcommand)]
    List(ListCommands),
}

#[derive(Subcommand)]
pub enum CompareCommands {
    /// Compare regions for one resource
    Regions {
        #[arg(long, short)]
        service: ServiceType,

        #[arg(long, short)]
        resource: String,

        /// Candidate regions (every known region if omitted)
        #[arg(long, value_delimiter = ',')]
        regions: Vec<String>,

        /// Ranking metric (carbon, total-carbon, water, energy, cost, score)
        #[arg(long, short, default_value = "carbon")]
        metric: RankingMetric,

        /// Current region to report deltas and improvements against
        #[arg(long, short)]
        baseline: Option<String>,

        #[command(flatten)]
        usage: UsageArgs,
    },

    /// Compare resource classes within one region
    Classes {
        #[arg(long, short)]
        service: ServiceType,

        #[arg(long, short = 'g')]
        region: String,

        /// Candidate instance types, storage classes or model ids
        #[arg(long, value_delimiter = ',', required = true)]
        classes: Vec<String>,

        #[arg(long, short, default_value = "carbon")]
        metric: RankingMetric,

        #[command(flatten)]
        usage: UsageArgs,
    },
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// Show region factors
    Regions,

    /// Show AI model energy profiles
    Models,

    /// Show resource classes known for a service
    Classes {
        #[arg(long, short)]
        service: ServiceType,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_engine(cli: &Cli) -> Result<ImpactEngine> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("Failed to load engine configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(region) = &cli.default_region {
        config.default_region = region.clone();
    }

    let store = ReferenceStore::load_from_config(&config)
        .await
        .with_context(|| format!("Failed to load reference data from {}", config.data_dir.display()))?;
    info!(data_dir = %config.data_dir.display(), digest = %store.digest(), "Reference data loaded");

    Ok(ImpactEngine::from_config(Arc::new(store), &config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let engine = build_engine(&cli).await?;

    match &cli.command {
        Commands::Estimate {
            service,
            resource,
            region,
            usage,
        } => {
            estimate::run(&engine, *service, resource, region, usage, cli.format)?;
        }
        Commands::Compare(compare_cmd) => match compare_cmd {
            CompareCommands::Regions {
                service,
                resource,
                regions,
                metric,
                baseline,
                usage,
            } => {
                let request = compare::RegionRequest {
                    service: *service,
                    resource,
                    regions,
                    metric: *metric,
                    baseline: baseline.as_deref(),
                    usage,
                };
                compare::regions(engine, request, cli.format)?;
            }
            CompareCommands::Classes {
                service,
                region,
                classes,
                metric,
                usage,
            } => {
                compare::classes(engine, *service, region, classes, *metric, usage, cli.format)?;
            }
        },
        Commands::List(list_cmd) => match list_cmd {
            ListCommands::Regions => list::regions(engine.store(), cli.format)?,
            ListCommands::Models => list::models(engine.store(), cli.format)?,
            ListCommands::Classes { service } => list::classes(engine.store(), *service, cli.format)?,
        },
    }

    if cli.metrics {
        eprintln!("{}", EngineMetrics::new().render());
    }

    Ok(())
}
