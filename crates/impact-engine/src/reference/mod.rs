//! Reference data store
//!
//! Loads every reference table once into indexed, read-only lookups:
//! - Regional factors (carbon intensity, PUE, water usage, water stress)
//! - Model energy profiles with linked training footprints
//! - Hardware coefficients for compute, object storage and databases
//! - Optional unit prices
//!
//! Once built, a store is never mutated and can be shared across threads
//! behind an `Arc` without locking.

mod model;
pub mod pricing;
mod region;
mod resource;
mod table;


use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ImpactError, Result};
use crate::models::{ModelEnergyProfile, RegionFactors, ResourceCoefficients, ServiceType};
use crate::observability::{EngineMetrics, StructuredLogger};
pub use pricing::PriceBook;
use table::Table;

pub const MODEL_ENERGY_TABLE: &str = "model_energy_consumption.csv";
pub const MODEL_TRAINING_TABLE: &str = "model_training_footprint.csv";
pub const CARBON_INTENSITY_TABLE: &str = "region_carbon_intensity.csv";
pub const WATER_USAGE_TABLE: &str = "region_water_usage.csv";
pub const PUE_TABLE: &str = "region_pue.csv";
pub const WATER_STRESS_TABLE: &str = "region_water_stress.csv";
pub const COMPUTE_TABLE: &str = "compute_energy.csv";
pub const STORAGE_TABLE: &str = "storage_energy.csv";
pub const DATABASE_TABLE: &str = "database_energy.csv";
pub const PRICING_TABLE: &str = "pricing.csv";

/// What a lookup does when the key is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPolicy {
    /// Surface the miss to the caller
    FailOnMiss,
    /// Substitute the table's declared default and flag the substitution
    FallbackToDefault,
}

/// Kinds of keyed lookup the store serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Region,
    Model,
    ResourceClass,
}

impl TableKind {
    /// The miss policy of each table kind
    pub fn policy(&self) -> LookupPolicy {
        match self {
            TableKind::Region => LookupPolicy::FallbackToDefault,
            TableKind::Model | TableKind::ResourceClass => LookupPolicy::FailOnMiss,
        }
    }
}

/// Result of a policy-governed lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup<'a, T> {
    pub value: &'a T,
    /// True when `value` is the default standing in for a missing key
    pub fallback: bool,
}

/// Apply a table kind's miss policy to a raw index hit
fn resolve<'a, T>(kind: TableKind, found: Option<&'a T>, default: Option<&'a T>) -> Option<Lookup<'a, T>> {
    match (found, kind.policy()) {
        (Some(value), _) => Some(Lookup {
            value,
            fallback: false,
        }),
        (None, LookupPolicy::FallbackToDefault) => default.map(|value| Lookup {
            value,
            fallback: true,
        }),
        (None, LookupPolicy::FailOnMiss) => None,
    }
}

/// File locations of every reference table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSources {
    pub model_energy: PathBuf,
    pub model_training: PathBuf,
    pub carbon_intensity: PathBuf,
    pub water_usage: PathBuf,
    pub pue: PathBuf,
    pub water_stress: PathBuf,
    pub compute: PathBuf,
    pub storage: PathBuf,
    pub database: PathBuf,
    /// A missing pricing file disables cost estimation instead of failing the load
    pub pricing: Option<PathBuf>,
}

impl TableSources {
    /// Default file names inside one directory
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_energy: dir.join(MODEL_ENERGY_TABLE),
            model_training: dir.join(MODEL_TRAINING_TABLE),
            carbon_intensity: dir.join(CARBON_INTENSITY_TABLE),
            water_usage: dir.join(WATER_USAGE_TABLE),
            pue: dir.join(PUE_TABLE),
            water_stress: dir.join(WATER_STRESS_TABLE),
            compute: dir.join(COMPUTE_TABLE),
            storage: dir.join(STORAGE_TABLE),
            database: dir.join(DATABASE_TABLE),
            pricing: Some(dir.join(PRICING_TABLE)),
        }
    }
}

/// Raw table contents, for stores built from memory
#[derive(Debug, Clone, Default)]
pub struct TableContents {
    pub model_energy: String,
    pub model_training: String,
    pub carbon_intensity: String,
    pub water_usage: String,
    pub pue: String,
    pub water_stress: String,
    pub compute: String,
    pub storage: String,
    pub database: String,
    pub pricing: Option<String>,
}

async fn read_required(table: &str, path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ImpactError::load(
            table,
            0,
            format!("required table not found at {}", path.display()),
        )),
        Err(e) => Err(ImpactError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

async fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No pricing table, cost estimation disabled");
            Ok(None)
        }
        Err(e) => Err(ImpactError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

impl TableContents {
    /// Read every table from disk
    pub async fn read(sources: &TableSources) -> Result<Self> {
        Ok(Self {
            model_energy: read_required(MODEL_ENERGY_TABLE, &sources.model_energy).await?,
            model_training: read_required(MODEL_TRAINING_TABLE, &sources.model_training).await?,
            carbon_intensity: read_required(CARBON_INTENSITY_TABLE, &sources.carbon_intensity)
                .await?,
            water_usage: read_required(WATER_USAGE_TABLE, &sources.water_usage).await?,
            pue: read_required(PUE_TABLE, &sources.pue).await?,
            water_stress: read_required(WATER_STRESS_TABLE, &sources.water_stress).await?,
            compute: read_required(COMPUTE_TABLE, &sources.compute).await?,
            storage: read_required(STORAGE_TABLE, &sources.storage).await?,
            database: read_required(DATABASE_TABLE, &sources.database).await?,
            pricing: read_optional(sources.pricing.as_deref()).await?,
        })
    }

    /// SHA-256 over every table in a fixed order
    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, content) in self.named() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(content.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    fn named(&self) -> Vec<(&'static str, &str)> {
        let mut tables = vec![
            (MODEL_ENERGY_TABLE, self.model_energy.as_str()),
            (MODEL_TRAINING_TABLE, self.model_training.as_str()),
            (CARBON_INTENSITY_TABLE, self.carbon_intensity.as_str()),
            (WATER_USAGE_TABLE, self.water_usage.as_str()),
            (PUE_TABLE, self.pue.as_str()),
            (WATER_STRESS_TABLE, self.water_stress.as_str()),
            (COMPUTE_TABLE, self.compute.as_str()),
            (STORAGE_TABLE, self.storage.as_str()),
            (DATABASE_TABLE, self.database.as_str()),
        ];
        if let Some(pricing) = &self.pricing {
            tables.push((PRICING_TABLE, pricing.as_str()));
        }
        tables
    }
}

/// Immutable, indexed reference data
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    regions: BTreeMap<String, RegionFactors>,
    default_factors: RegionFactors,
    models: BTreeMap<String, ModelEnergyProfile>,
    resource_classes: BTreeMap<ServiceType, BTreeMap<String, ResourceCoefficients>>,
    prices: PriceBook,
    row_counts: BTreeMap<&'static str, usize>,
    digest: String,
}

impl ReferenceStore {
    /// Read and index every table; any malformed table fails the whole load
    pub async fn load(sources: &TableSources, default_region: &str) -> Result<Self> {
        let contents = TableContents::read(sources).await?;
        Self::from_contents(&contents, default_region)
    }

    /// Load from the configured data directory and default region
    pub async fn load_from_config(config: &EngineConfig) -> Result<Self> {
        Self::load(&TableSources::from_dir(&config.data_dir), &config.default_region).await
    }

    /// Build a store from in-memory table contents
    pub fn from_contents(contents: &TableContents, default_region: &str) -> Result<Self> {
        let model_energy = Table::parse(MODEL_ENERGY_TABLE, &contents.model_energy)?;
        let model_training = Table::parse(MODEL_TRAINING_TABLE, &contents.model_training)?;
        let carbon = Table::parse(CARBON_INTENSITY_TABLE, &contents.carbon_intensity)?;
        let water_usage = Table::parse(WATER_USAGE_TABLE, &contents.water_usage)?;
        let pue = Table::parse(PUE_TABLE, &contents.pue)?;
        let water_stress = Table::parse(WATER_STRESS_TABLE, &contents.water_stress)?;
        let compute = Table::parse(COMPUTE_TABLE, &contents.compute)?;
        let storage = Table::parse(STORAGE_TABLE, &contents.storage)?;
        let database = Table::parse(DATABASE_TABLE, &contents.database)?;
        let pricing = contents
            .pricing
            .as_deref()
            .map(|content| Table::parse(PRICING_TABLE, content))
            .transpose()?;

        let regions =
            region::build_region_index(&carbon, &pue, &water_usage, &water_stress, default_region)?;
        let default_factors = regions
            .get(default_region)
            .cloned()
            .ok_or_else(|| {
                ImpactError::load(
                    CARBON_INTENSITY_TABLE,
                    0,
                    format!("default region '{}' has no carbon intensity row", default_region),
                )
            })?;
        let models = model::build_model_index(&model_energy, &model_training)?;

        let mut resource_classes = BTreeMap::new();
        resource_classes.insert(ServiceType::Compute, resource::build_compute_index(&compute)?);
        resource_classes.insert(
            ServiceType::ObjectStorage,
            resource::build_storage_index(&storage)?,
        );
        resource_classes.insert(
            ServiceType::RelationalStorage,
            resource::build_database_index(&database)?,
        );

        let prices = match &pricing {
            Some(table) => PriceBook::from_table(table)?,
            None => PriceBook::default(),
        };

        let mut row_counts = BTreeMap::new();
        for table in [
            &model_energy,
            &model_training,
            &carbon,
            &water_usage,
            &pue,
            &water_stress,
            &compute,
            &storage,
            &database,
        ] {
            row_counts.insert(table.name(), table.rows().len());
        }
        if let Some(table) = &pricing {
            row_counts.insert(table.name(), table.rows().len());
        }

        let store = Self {
            regions,
            default_factors,
            models,
            resource_classes,
            prices,
            row_counts,
            digest: contents.digest(),
        };

        let metrics = EngineMetrics::new();
        for (table, rows) in &store.row_counts {
            metrics.set_table_rows(table, *rows);
        }
        StructuredLogger::new("reference-store").log_store_loaded(
            store.regions.len(),
            store.models.len(),
            store.resource_classes.values().map(BTreeMap::len).sum(),
            pricing.is_some(),
            &store.digest,
        );

        Ok(store)
    }

    /// Factors for a region, falling back to the default region when unknown
    pub fn lookup_region(&self, region: &str) -> Lookup<'_, RegionFactors> {
        resolve(
            TableKind::Region,
            self.regions.get(region),
            Some(&self.default_factors),
        )
        .unwrap_or(Lookup {
            value: &self.default_factors,
            fallback: true,
        })
    }

    /// Energy profile of a model; unknown models are an error
    pub fn lookup_model(&self, model_id: &str) -> Result<&ModelEnergyProfile> {
        resolve(TableKind::Model, self.models.get(model_id), None)
            .map(|hit| hit.value)
            .ok_or_else(|| ImpactError::UnknownModel(model_id.to_string()))
    }

    /// Coefficients of a resource class within a service
    pub fn lookup_resource_class(
        &self,
        service: ServiceType,
        class_id: &str,
    ) -> Result<&ResourceCoefficients> {
        let found = self
            .resource_classes
            .get(&service)
            .and_then(|classes| classes.get(class_id));
        resolve(TableKind::ResourceClass, found, None)
            .map(|hit| hit.value)
            .ok_or_else(|| ImpactError::UnknownResourceClass {
                service: service.to_string(),
                class: class_id.to_string(),
            })
    }

    pub fn default_region(&self) -> &str {
        &self.default_factors.region
    }

    pub fn prices(&self) -> &PriceBook {
        &self.prices
    }

    /// Hex SHA-256 fingerprint of the loaded tables
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn row_counts(&self) -> &BTreeMap<&'static str, usize> {
        &self.row_counts
    }

    /// Known region codes, sorted
    pub fn regions(&self) -> impl Iterator<Item = &RegionFactors> {
        self.regions.values()
    }

    pub fn region_codes(&self) -> Vec<&str> {
        self.regions.keys().map(String::as_str).collect()
    }

    /// Known models, sorted by id
    pub fn models(&self) -> impl Iterator<Item = &ModelEnergyProfile> {
        self.models.values()
    }

    /// Known resource class ids of a service, sorted
    ///
    /// For model inference the classes are the model ids.
    pub fn resource_classes(&self, service: ServiceType) -> Vec<&str> {
        match service {
            ServiceType::ModelInference => self.models.keys().map(String::as_str).collect(),
            _ => self
                .resource_classes
                .get(&service)
                .map(|classes| classes.keys().map(String::as_str).collect())
                .unwrap_or_default(),
        }
    }
}
