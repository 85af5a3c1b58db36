//! Relational database energy: compute term plus allocated storage

use super::compute::{vcpu_hours, UtilizationCurve};
use super::{checked_coefficient, EnergyCalculator, EnergyEstimate};
use crate::error::{ImpactError, Result};
use crate::models::{dimensions, ResourceCoefficients, ServiceType, UsageRecord};
use crate::reference::ReferenceStore;

pub struct RelationalCalculator {
    curve: UtilizationCurve,
}

impl RelationalCalculator {
    pub fn new(curve: UtilizationCurve) -> Self {
        Self { curve }
    }
}

impl EnergyCalculator for RelationalCalculator {
    fn service_type(&self) -> ServiceType {
        ServiceType::RelationalStorage
    }

    fn estimate_energy(&self, record: &UsageRecord, store: &ReferenceStore) -> Result<EnergyEstimate> {
        let class = record.resource_id();
        let (per_vcpu_hour_wh, per_gb_wh, vcpus) =
            match store.lookup_resource_class(ServiceType::RelationalStorage, class)? {
                ResourceCoefficients::Relational {
                    per_vcpu_hour_wh,
                    per_gb_wh,
                    vcpus,
                } => (*per_vcpu_hour_wh, *per_gb_wh, *vcpus),
                _ => {
                    return Err(ImpactError::UnknownResourceClass {
                        service: ServiceType::RelationalStorage.to_string(),
                        class: class.to_string(),
                    })
                }
            };

        let per_vcpu_hour_wh = checked_coefficient(class, "per_vcpu_hour_wh", per_vcpu_hour_wh)?;
        let per_gb_wh = checked_coefficient(class, "per_gb_wh", per_gb_wh)?;

        // Utilization scales the compute term only
        let vcpu_hours = vcpu_hours(record, class, vcpus)?;
        let compute_wh = vcpu_hours * per_vcpu_hour_wh * self.curve.adjustment(record);
        let storage_wh = record.quantity(dimensions::STORAGE_GB) * per_gb_wh;

        Ok(EnergyEstimate {
            energy_wh: compute_wh + storage_wh,
            resource_class: class.to_string(),
            embodied_gco2e: 0.0,
            vcpu_hours: Some(vcpu_hours),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UtilizationPoint;
    use crate::reference::tests::sample_contents;
    use approx::assert_relative_eq;

    fn store() -> ReferenceStore {
        ReferenceStore::from_contents(&sample_contents(), "us-east-1").unwrap()
    }

    fn record() -> UsageRecord {
        UsageRecord::new(ServiceType::RelationalStorage, "db.m5.large", "us-east-1")
            .with_usage(dimensions::HOURS, 10.0)
            .with_usage(dimensions::STORAGE_GB, 1000.0)
    }

    fn curve() -> UtilizationCurve {
        UtilizationCurve::new(vec![
            UtilizationPoint {
                utilization: 0.0,
                multiplier: 0.5,
            },
            UtilizationPoint {
                utilization: 1.0,
                multiplier: 1.0,
            },
        ])
    }

    #[test]
    fn test_compute_and_storage_terms() {
        let estimate = RelationalCalculator::new(UtilizationCurve::default())
            .estimate_energy(&record(), &store())
            .unwrap();

        // 10 h x 2 vCPU x 5 Wh + 1000 GB x 0.0004
        assert_relative_eq!(estimate.energy_wh, 100.4, epsilon = 1e-9);
        assert_eq!(estimate.vcpu_hours, Some(20.0));
    }

    #[test]
    fn test_utilization_scales_compute_term_only() {
        let calculator = RelationalCalculator::new(curve());

        let idle = record().with_usage(dimensions::UTILIZATION, 0.0);
        let estimate = calculator.estimate_energy(&idle, &store()).unwrap();
        assert_relative_eq!(estimate.energy_wh, 50.0 + 0.4, epsilon = 1e-9);

        let storage_only = UsageRecord::new(ServiceType::RelationalStorage, "db.m5.large", "us-east-1")
            .with_usage(dimensions::STORAGE_GB, 1000.0)
            .with_usage(dimensions::UTILIZATION, 0.0);
        let estimate = calculator.estimate_energy(&storage_only, &store()).unwrap();
        assert_relative_eq!(estimate.energy_wh, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_storage_coefficient() {
        let mut contents = sample_contents();
        contents.database = "instance_class,per_vcpu_hour_wh,per_gb_wh,vcpus\n\
            db.m5.large,5.0,-0.0004,2\n"
            .to_string();
        let store = ReferenceStore::from_contents(&contents, "us-east-1").unwrap();

        match RelationalCalculator::new(UtilizationCurve::default()).estimate_energy(&record(), &store) {
            Err(ImpactError::DataIntegrity { field, .. }) => assert_eq!(field, "per_gb_wh"),
            other => panic!("expected DataIntegrity, got {:?}", other),
        }
    }
}
