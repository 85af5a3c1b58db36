//! Impact composition
//!
//! Turns a calculator's energy estimate into carbon and water using the
//! resolved region's factors:
//!
//! ```text
//! carbon_gco2e = energy_wh / 1000 * PUE * carbon_intensity
//! water_liters = energy_wh / 1000 * PUE * WUE
//! ```
//!
//! Model inference additionally carries amortized training carbon. A
//! composition either produces a complete result or an error; nothing is
//! partially applied.

use std::sync::Arc;
use std::time::Instant;

use crate::calculator::CalculatorRegistry;
use crate::config::{EngineConfig, ScoringConfig};
use crate::cost::estimate_cost;
use crate::equivalents::impact_score;
use crate::error::{ImpactError, Result};
use crate::models::{Equivalents, ImpactResult, RegionFactors, Resolution, UsageRecord};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::reference::ReferenceStore;

/// Evaluates usage records against a loaded reference store
///
/// Cheap to clone; clones share the store and calculators.
#[derive(Clone)]
pub struct ImpactEngine {
    store: Arc<ReferenceStore>,
    registry: CalculatorRegistry,
    scoring: ScoringConfig,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

fn check_region_factors(factors: &RegionFactors) -> Result<()> {
    let region = factors.region.as_str();
    if !factors.pue.is_finite() || factors.pue < 1.0 {
        return Err(ImpactError::integrity(region, "pue", factors.pue, "PUE must be at least 1.0"));
    }
    if !factors.carbon_intensity_gco2e_kwh.is_finite() || factors.carbon_intensity_gco2e_kwh < 0.0 {
        return Err(ImpactError::integrity(
            region,
            "carbon_intensity_gco2e_kwh",
            factors.carbon_intensity_gco2e_kwh,
            "carbon intensity must be non-negative",
        ));
    }
    if !factors.water_usage_liters_per_kwh.is_finite() || factors.water_usage_liters_per_kwh < 0.0 {
        return Err(ImpactError::integrity(
            region,
            "water_usage_liters_per_kwh",
            factors.water_usage_liters_per_kwh,
            "water usage must be non-negative",
        ));
    }
    Ok(())
}

impl ImpactEngine {
    pub fn new(store: Arc<ReferenceStore>, registry: CalculatorRegistry, scoring: ScoringConfig) -> Self {
        Self {
            store,
            registry,
            scoring,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("impact-engine"),
        }
    }

    /// Engine with the built-in calculators configured from `config`
    pub fn from_config(store: Arc<ReferenceStore>, config: &EngineConfig) -> Self {
        Self::new(
            store,
            CalculatorRegistry::with_defaults(config),
            config.scoring.clone(),
        )
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn registry(&self) -> &CalculatorRegistry {
        &self.registry
    }

    /// Evaluate one usage record
    pub fn evaluate(&self, record: &UsageRecord) -> Result<ImpactResult> {
        let start = Instant::now();
        let outcome = self.compose(record);

        match &outcome {
            Ok(result) => {
                self.metrics.inc_evaluations(record.service_type().as_str());
                self.metrics
                    .observe_evaluation_latency(start.elapsed().as_secs_f64());
                if result.resolution.region_fallback {
                    self.metrics.inc_region_fallbacks();
                }
                self.logger.log_evaluation(
                    record.service_type().as_str(),
                    record.resource_id(),
                    &result.resolution.region,
                    result.energy_wh,
                    result.total_gco2e,
                );
            }
            Err(err) => {
                self.metrics.inc_evaluation_failures(err.kind());
                if let ImpactError::DataIntegrity {
                    subject,
                    field,
                    value,
                    reason,
                } = err
                {
                    self.logger.log_integrity_fault(subject, field, *value, reason);
                }
            }
        }

        outcome
    }

    fn compose(&self, record: &UsageRecord) -> Result<ImpactResult> {
        let calculator = self.registry.resolve(record.service_type())?;
        let estimate = calculator.estimate_energy(record, &self.store)?;
        if !estimate.energy_wh.is_finite() || estimate.energy_wh < 0.0 {
            return Err(ImpactError::integrity(
                estimate.resource_class.as_str(),
                "energy_wh",
                estimate.energy_wh,
                "estimated energy must be a non-negative number",
            ));
        }

        let lookup = self.store.lookup_region(record.region());
        let factors = lookup.value;
        if lookup.fallback {
            self.logger.log_region_fallback(record.region(), &factors.region);
        }
        if !factors.defaulted_fields.is_empty() {
            self.logger
                .log_defaulted_fields(&factors.region, &factors.defaulted_fields);
        }
        check_region_factors(factors)?;

        let energy_kwh = estimate.energy_wh / 1000.0;
        let carbon_gco2e = energy_kwh * factors.pue * factors.carbon_intensity_gco2e_kwh;
        let water_liters = energy_kwh * factors.pue * factors.water_usage_liters_per_kwh;
        let amortized_embodied_gco2e = estimate.embodied_gco2e;
        let total_gco2e = carbon_gco2e + amortized_embodied_gco2e;

        let cost_usd = estimate_cost(self.store.prices(), record, &estimate)?;
        let impact_score = impact_score(
            &self.scoring,
            carbon_gco2e,
            amortized_embodied_gco2e,
            water_liters,
            factors.water_stress,
        );

        Ok(ImpactResult {
            service_type: record.service_type(),
            resource_id: record.resource_id().to_string(),
            energy_wh: estimate.energy_wh,
            facility_energy_wh: estimate.energy_wh * factors.pue,
            carbon_gco2e,
            water_liters,
            amortized_embodied_gco2e,
            total_gco2e,
            cost_usd,
            water_stress: factors.water_stress,
            impact_score,
            equivalents: Equivalents::from_impact(total_gco2e, water_liters),
            resolution: Resolution {
                requested_region: record.region().to_string(),
                region: factors.region.clone(),
                region_fallback: lookup.fallback,
                resource_class: estimate.resource_class,
                defaulted_region_fields: factors.defaulted_fields.clone(),
            },
        })
    }
}
