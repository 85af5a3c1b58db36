//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ImpactError, Result};

/// Environment variable prefix (`IMPACT_DEFAULT_REGION`, `IMPACT_SCORING__WATER_WEIGHT`)
pub const ENV_PREFIX: &str = "IMPACT";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the reference tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Region whose factors stand in for unknown regions
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Breakpoints of the compute utilization adjustment
    #[serde(default)]
    pub utilization_curve: Vec<UtilizationPoint>,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// One breakpoint of the piecewise-linear utilization curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationPoint {
    pub utilization: f64,
    pub multiplier: f64,
}

/// Weights and reference magnitudes of the combined impact score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_carbon_weight")]
    pub carbon_weight: f64,
    #[serde(default = "default_embodied_weight")]
    pub embodied_weight: f64,
    #[serde(default = "default_water_weight")]
    pub water_weight: f64,
    #[serde(default = "default_carbon_reference")]
    pub carbon_reference_gco2e: f64,
    #[serde(default = "default_embodied_reference")]
    pub embodied_reference_gco2e: f64,
    #[serde(default = "default_water_reference")]
    pub water_reference_liters: f64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_carbon_weight() -> f64 {
    0.5
}

fn default_embodied_weight() -> f64 {
    0.3
}

fn default_water_weight() -> f64 {
    0.2
}

fn default_carbon_reference() -> f64 {
    10_000.0
}

fn default_embodied_reference() -> f64 {
    10_000.0
}

fn default_water_reference() -> f64 {
    1_000.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            carbon_weight: default_carbon_weight(),
            embodied_weight: default_embodied_weight(),
            water_weight: default_water_weight(),
            carbon_reference_gco2e: default_carbon_reference(),
            embodied_reference_gco2e: default_embodied_reference(),
            water_reference_liters: default_water_reference(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_region: default_region(),
            utilization_curve: Vec::new(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let config: EngineConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot evaluate with
    pub fn validate(&self) -> Result<()> {
        if self.default_region.trim().is_empty() {
            return Err(ImpactError::Config("default_region must not be empty".into()));
        }

        for point in &self.utilization_curve {
            if !(0.0..=1.0).contains(&point.utilization) {
                return Err(ImpactError::Config(format!(
                    "utilization breakpoint {} outside [0, 1]",
                    point.utilization
                )));
            }
            if !point.multiplier.is_finite() || point.multiplier < 0.0 {
                return Err(ImpactError::Config(format!(
                    "utilization multiplier {} must be a non-negative number",
                    point.multiplier
                )));
            }
        }

        let s = &self.scoring;
        for (name, value) in [
            ("carbon_weight", s.carbon_weight),
            ("embodied_weight", s.embodied_weight),
            ("water_weight", s.water_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ImpactError::Config(format!("{} must be non-negative", name)));
            }
        }
        for (name, value) in [
            ("carbon_reference_gco2e", s.carbon_reference_gco2e),
            ("embodied_reference_gco2e", s.embodied_reference_gco2e),
            ("water_reference_liters", s.water_reference_liters),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ImpactError::Config(format!("{} must be positive", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_region, "us-east-1");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.utilization_curve.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
default_region = "eu-west-1"
data_dir = "/srv/impact"

[[utilization_curve]]
utilization = 0.0
multiplier = 0.4

[[utilization_curve]]
utilization = 1.0
multiplier = 1.0

[scoring]
water_weight = 0.4
"#
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.default_region, "eu-west-1");
        assert_eq!(config.data_dir, PathBuf::from("/srv/impact"));
        assert_eq!(config.utilization_curve.len(), 2);
        assert_eq!(config.scoring.water_weight, 0.4);
        assert_eq!(config.scoring.carbon_weight, 0.5);
    }

    #[test]
    fn test_invalid_curve_rejected() {
        let config = EngineConfig {
            utilization_curve: vec![UtilizationPoint {
                utilization: 1.5,
                multiplier: 1.0,
            }],
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ImpactError::Config(_))));

        let config = EngineConfig {
            utilization_curve: vec![UtilizationPoint {
                utilization: 0.5,
                multiplier: -0.1,
            }],
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ImpactError::Config(_))));
    }

    #[test]
    fn test_non_positive_reference_rejected() {
        let mut config = EngineConfig::default();
        config.scoring.water_reference_liters = 0.0;
        assert!(config.validate().is_err());
    }
}
