//! Core data models for the impact engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ImpactError;

/// Service families with a registered energy model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Compute,
    ObjectStorage,
    RelationalStorage,
    ModelInference,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Compute,
        ServiceType::ObjectStorage,
        ServiceType::RelationalStorage,
        ServiceType::ModelInference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Compute => "compute",
            ServiceType::ObjectStorage => "object-storage",
            ServiceType::RelationalStorage => "relational-storage",
            ServiceType::ModelInference => "model-inference",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "compute" | "ec2" => Ok(ServiceType::Compute),
            "object-storage" | "s3" => Ok(ServiceType::ObjectStorage),
            "relational-storage" | "rds" | "database" => Ok(ServiceType::RelationalStorage),
            "model-inference" | "bedrock" | "sagemaker" => Ok(ServiceType::ModelInference),
            _ => Err(ImpactError::UnsupportedService(s.to_string())),
        }
    }
}

/// Well-known usage dimension names
pub mod dimensions {
    pub const VCPU_HOURS: &str = "vcpu_hours";
    pub const HOURS: &str = "hours";
    /// Instance count for the `hours` form, default 1
    pub const COUNT: &str = "count";
    pub const UTILIZATION: &str = "utilization";
    pub const STORAGE_GB: &str = "storage_gb";
    pub const GET_REQUESTS: &str = "get_requests";
    pub const PUT_REQUESTS: &str = "put_requests";
    pub const INPUT_TOKENS: &str = "input_tokens";
    pub const OUTPUT_TOKENS: &str = "output_tokens";
    pub const INFERENCES: &str = "inferences";
}

/// One resource-usage record to evaluate
///
/// Records are immutable; the `with_*` helpers return a modified copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    service_type: ServiceType,
    resource_id: String,
    region: String,
    #[serde(default)]
    usage: BTreeMap<String, f64>,
}

impl UsageRecord {
    pub fn new(
        service_type: ServiceType,
        resource_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            service_type,
            resource_id: resource_id.into(),
            region: region.into(),
            usage: BTreeMap::new(),
        }
    }

    /// Add a usage dimension while building a record
    pub fn with_usage(mut self, dimension: impl Into<String>, quantity: f64) -> Self {
        self.usage.insert(dimension.into(), quantity);
        self
    }

    pub fn with_region(&self, region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..self.clone()
        }
    }

    pub fn with_resource_id(&self, resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..self.clone()
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn usage(&self) -> &BTreeMap<String, f64> {
        &self.usage
    }

    pub fn has(&self, dimension: &str) -> bool {
        self.usage.contains_key(dimension)
    }

    /// Quantity of a dimension; missing, negative and NaN read as zero
    pub fn quantity(&self, dimension: &str) -> f64 {
        self.quantity_or(dimension, 0.0)
    }

    pub fn quantity_or(&self, dimension: &str, default: f64) -> f64 {
        match self.usage.get(dimension) {
            Some(v) if v.is_nan() => 0.0,
            Some(v) => v.max(0.0),
            None => default,
        }
    }
}

/// Ordinal water-stress category of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WaterStress {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl WaterStress {
    /// Multiplier applied to water usage in the combined score
    pub fn multiplier(&self) -> f64 {
        match self {
            WaterStress::Low => 1.0,
            WaterStress::Medium => 1.5,
            WaterStress::High => 2.0,
            WaterStress::VeryHigh => 3.0,
        }
    }

    /// Parse a level name or a 0-5 numeric stress score
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "low" | "low medium" => return Some(WaterStress::Low),
            "medium" => return Some(WaterStress::Medium),
            "high" | "medium high" => return Some(WaterStress::High),
            "very high" | "extremely high" => return Some(WaterStress::VeryHigh),
            _ => {}
        }

        let score: f64 = raw.trim().parse().ok()?;
        if !(0.0..=5.0).contains(&score) {
            return None;
        }
        Some(if score < 2.0 {
            WaterStress::Low
        } else if score < 3.0 {
            WaterStress::Medium
        } else if score < 4.0 {
            WaterStress::High
        } else {
            WaterStress::VeryHigh
        })
    }
}

impl fmt::Display for WaterStress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaterStress::Low => "Low",
            WaterStress::Medium => "Medium",
            WaterStress::High => "High",
            WaterStress::VeryHigh => "Very High",
        };
        f.write_str(name)
    }
}

/// Region factors that can be borrowed from the default region at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionField {
    Pue,
    WaterUsage,
    WaterStress,
}

impl RegionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionField::Pue => "pue",
            RegionField::WaterUsage => "water_usage",
            RegionField::WaterStress => "water_stress",
        }
    }
}

impl fmt::Display for RegionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-region grid and facility factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFactors {
    pub region: String,
    pub carbon_intensity_gco2e_kwh: f64,
    pub category: Option<String>,
    pub pue: f64,
    pub water_usage_liters_per_kwh: f64,
    pub water_stress: WaterStress,
    /// Factors taken from the default region because this region had no row
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaulted_fields: Vec<RegionField>,
}

/// Training footprint used to amortize embodied carbon per inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingFootprint {
    pub total_emissions_gco2e: f64,
    pub expected_inferences: f64,
}

/// Token energy profile of an AI model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEnergyProfile {
    pub model_id: String,
    pub input_energy_wh_per_token: f64,
    pub output_energy_wh_per_token: f64,
    pub training: Option<TrainingFootprint>,
}

/// Per-class energy coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceCoefficients {
    Compute {
        per_vcpu_hour_wh: f64,
        vcpus: Option<f64>,
    },
    ObjectStorage {
        per_gb_wh: f64,
        per_request_wh: f64,
    },
    Relational {
        per_vcpu_hour_wh: f64,
        per_gb_wh: f64,
        vcpus: Option<f64>,
    },
}

/// Which reference entries an evaluation actually used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub requested_region: String,
    pub region: String,
    pub region_fallback: bool,
    pub resource_class: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaulted_region_fields: Vec<RegionField>,
}

/// Everyday equivalents of an impact figure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equivalents {
    pub miles_driven: f64,
    pub smartphone_charges: f64,
    pub tree_months: f64,
    pub laptop_hours: f64,
    pub shower_minutes: f64,
}

/// Impact of one usage record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub service_type: ServiceType,
    pub resource_id: String,
    pub energy_wh: f64,
    /// IT energy multiplied by the facility PUE
    pub facility_energy_wh: f64,
    pub carbon_gco2e: f64,
    pub water_liters: f64,
    pub amortized_embodied_gco2e: f64,
    pub total_gco2e: f64,
    pub cost_usd: Option<f64>,
    pub water_stress: WaterStress,
    pub impact_score: f64,
    pub equivalents: Equivalents,
    pub resolution: Resolution,
}
