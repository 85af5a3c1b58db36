//! Command implementations

pub mod compare;
pub mod estimate;
pub mod list;

use anyhow::{anyhow, Result};
use clap::Args;
use impact_engine::{ServiceType, UsageRecord};

/// Usage quantities shared by every evaluating command
#[derive(Args, Debug, Clone, Default)]
pub struct UsageArgs {
    /// Usage quantity as dimension=value (e.g. vcpu_hours=730, hours=24, count=3, input_tokens=1000)
    #[arg(long = "usage", short = 'u', value_parser = parse_usage)]
    pub quantities: Vec<(String, f64)>,
}

impl UsageArgs {
    /// Build the usage record the engine evaluates
    pub fn record(&self, service: ServiceType, resource: &str, region: &str) -> UsageRecord {
        self.quantities
            .iter()
            .fold(UsageRecord::new(service, resource, region), |record, (dimension, value)| {
                record.with_usage(dimension.as_str(), *value)
            })
    }
}

fn parse_usage(raw: &str) -> Result<(String, f64)> {
    let (dimension, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected dimension=value, got '{}'", raw))?;

    let dimension = dimension.trim();
    if dimension.is_empty() {
        return Err(anyhow!("usage dimension must not be empty"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", value.trim()))?;
    if !value.is_finite() {
        return Err(anyhow!("usage value for {} must be finite", dimension));
    }

    Ok((dimension.to_string(), value))
}
