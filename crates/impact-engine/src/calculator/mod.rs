//! Per-service energy calculators
//!
//! Each service type has one calculator turning usage dimensions into IT
//! energy (Wh). The registry dispatches on a record's service type, so adding
//! a service means registering one more calculator.

mod compute;
mod inference;
mod object_storage;
mod relational;

pub use compute::{ComputeCalculator, UtilizationCurve};
pub use inference::InferenceCalculator;
pub use object_storage::ObjectStorageCalculator;
pub use relational::RelationalCalculator;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{ImpactError, Result};
use crate::models::{ServiceType, UsageRecord};
use crate::reference::ReferenceStore;

/// Energy attributed to one usage record before facility overhead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyEstimate {
    pub energy_wh: f64,
    /// Resource class or model whose coefficients were used
    pub resource_class: String,
    /// Amortized training carbon; zero for everything but model inference
    #[serde(default)]
    pub embodied_gco2e: f64,
    /// Billed vCPU-hours behind the energy figure, for services priced by them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpu_hours: Option<f64>,
}

/// Capability shared by every service calculator
pub trait EnergyCalculator: Send + Sync {
    /// Service type this calculator is registered for
    fn service_type(&self) -> ServiceType;

    /// Estimate the IT energy of a usage record
    fn estimate_energy(&self, record: &UsageRecord, store: &ReferenceStore) -> Result<EnergyEstimate>;
}

/// Reject a negative or non-finite coefficient read from the store
pub(crate) fn checked_coefficient(subject: &str, field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(ImpactError::integrity(
            subject,
            field,
            value,
            "coefficient must be a non-negative number",
        ));
    }
    Ok(value)
}

/// Calculators keyed by service type
#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    calculators: HashMap<ServiceType, Arc<dyn EnergyCalculator>>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four built-in calculators
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        let curve = UtilizationCurve::new(config.utilization_curve.clone());
        registry.register(Arc::new(ComputeCalculator::new(curve.clone())));
        registry.register(Arc::new(ObjectStorageCalculator));
        registry.register(Arc::new(RelationalCalculator::new(curve)));
        registry.register(Arc::new(InferenceCalculator));
        registry
    }

    /// Register a calculator, replacing any previous one for its service type
    pub fn register(&mut self, calculator: Arc<dyn EnergyCalculator>) -> Option<Arc<dyn EnergyCalculator>> {
        let service = calculator.service_type();
        tracing::debug!(service_type = %service, "Registered energy calculator");
        self.calculators.insert(service, calculator)
    }

    /// Calculator for a service type
    pub fn resolve(&self, service: ServiceType) -> Result<&dyn EnergyCalculator> {
        self.calculators
            .get(&service)
            .map(|calculator| calculator.as_ref())
            .ok_or_else(|| ImpactError::UnsupportedService(service.to_string()))
    }

    pub fn service_types(&self) -> Vec<ServiceType> {
        let mut services: Vec<_> = self.calculators.keys().copied().collect();
        services.sort();
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCalculator;

    impl EnergyCalculator for FixedCalculator {
        fn service_type(&self) -> ServiceType {
            ServiceType::Compute
        }

        fn estimate_energy(&self, record: &UsageRecord, _store: &ReferenceStore) -> Result<EnergyEstimate> {
            Ok(EnergyEstimate {
                energy_wh: 42.0,
                resource_class: record.resource_id().to_string(),
                embodied_gco2e: 0.0,
                vcpu_hours: None,
            })
        }
    }

    #[test]
    fn test_defaults_cover_every_service() {
        let registry = CalculatorRegistry::with_defaults(&EngineConfig::default());
        assert_eq!(registry.service_types(), ServiceType::ALL.to_vec());
        for service in ServiceType::ALL {
            assert_eq!(registry.resolve(service).unwrap().service_type(), service);
        }
    }

    #[test]
    fn test_unregistered_service() {
        let registry = CalculatorRegistry::new();
        assert!(matches!(
            registry.resolve(ServiceType::ObjectStorage),
            Err(ImpactError::UnsupportedService(_))
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CalculatorRegistry::with_defaults(&EngineConfig::default());
        let previous = registry.register(Arc::new(FixedCalculator));
        assert!(previous.is_some());
        assert_eq!(registry.service_types().len(), 4);
    }

    #[test]
    fn test_checked_coefficient() {
        assert_eq!(checked_coefficient("m5.large", "per_vcpu_hour_wh", 4.0).unwrap(), 4.0);
        assert!(matches!(
            checked_coefficient("m5.large", "per_vcpu_hour_wh", -0.1),
            Err(ImpactError::DataIntegrity { .. })
        ));
        assert!(checked_coefficient("m5.large", "per_vcpu_hour_wh", f64::NAN).is_err());
    }
}
