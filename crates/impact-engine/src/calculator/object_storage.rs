//! Object storage energy: stored volume plus request count

use super::{checked_coefficient, EnergyCalculator, EnergyEstimate};
use crate::error::{ImpactError, Result};
use crate::models::{dimensions, ResourceCoefficients, ServiceType, UsageRecord};
use crate::reference::ReferenceStore;

pub struct ObjectStorageCalculator;

impl EnergyCalculator for ObjectStorageCalculator {
    fn service_type(&self) -> ServiceType {
        ServiceType::ObjectStorage
    }

    fn estimate_energy(&self, record: &UsageRecord, store: &ReferenceStore) -> Result<EnergyEstimate> {
        let class = record.resource_id();
        let (per_gb_wh, per_request_wh) =
            match store.lookup_resource_class(ServiceType::ObjectStorage, class)? {
                ResourceCoefficients::ObjectStorage {
                    per_gb_wh,
                    per_request_wh,
                } => (*per_gb_wh, *per_request_wh),
                _ => {
                    return Err(ImpactError::UnknownResourceClass {
                        service: ServiceType::ObjectStorage.to_string(),
                        class: class.to_string(),
                    })
                }
            };

        let per_gb_wh = checked_coefficient(class, "per_gb_wh", per_gb_wh)?;
        let per_request_wh = checked_coefficient(class, "per_request_wh", per_request_wh)?;

        let requests =
            record.quantity(dimensions::GET_REQUESTS) + record.quantity(dimensions::PUT_REQUESTS);
        let energy_wh = record.quantity(dimensions::STORAGE_GB) * per_gb_wh + requests * per_request_wh;

        Ok(EnergyEstimate {
            energy_wh,
            resource_class: class.to_string(),
            embodied_gco2e: 0.0,
            vcpu_hours: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::tests::sample_contents;
    use approx::assert_relative_eq;

    fn record() -> UsageRecord {
        UsageRecord::new(ServiceType::ObjectStorage, "STANDARD", "us-east-1")
    }

    #[test]
    fn test_volume_and_request_terms() {
        let store = ReferenceStore::from_contents(&sample_contents(), "us-east-1").unwrap();
        let record = record()
            .with_usage(dimensions::STORAGE_GB, 1000.0)
            .with_usage(dimensions::GET_REQUESTS, 300.0)
            .with_usage(dimensions::PUT_REQUESTS, 200.0);

        let estimate = ObjectStorageCalculator.estimate_energy(&record, &store).unwrap();
        // 1000 GB x 0.0002 + (300 + 200) x 0.00001
        assert_relative_eq!(estimate.energy_wh, 0.205, epsilon = 1e-12);
        assert_eq!(estimate.resource_class, "STANDARD");
        assert_eq!(estimate.vcpu_hours, None);
    }

    #[test]
    fn test_requests_alone() {
        let store = ReferenceStore::from_contents(&sample_contents(), "us-east-1").unwrap();
        let record = record().with_usage(dimensions::PUT_REQUESTS, 1_000.0);

        let estimate = ObjectStorageCalculator.estimate_energy(&record, &store).unwrap();
        assert_relative_eq!(estimate.energy_wh, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_request_coefficient() {
        let mut contents = sample_contents();
        contents.storage =
            "storage_class,per_gb_wh,per_request_wh\nSTANDARD,0.0002,-0.00001\n".to_string();
        let store = ReferenceStore::from_contents(&contents, "us-east-1").unwrap();
        let record = record().with_usage(dimensions::STORAGE_GB, 10.0);

        match ObjectStorageCalculator.estimate_energy(&record, &store) {
            Err(ImpactError::DataIntegrity { subject, field, .. }) => {
                assert_eq!(subject, "STANDARD");
                assert_eq!(field, "per_request_wh");
            }
            other => panic!("expected DataIntegrity, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_class() {
        let store = ReferenceStore::from_contents(&sample_contents(), "us-east-1").unwrap();
        let record = UsageRecord::new(ServiceType::ObjectStorage, "TAPE", "us-east-1");
        assert!(matches!(
            ObjectStorageCalculator.estimate_energy(&record, &store),
            Err(ImpactError::UnknownResourceClass { .. })
        ));
    }
}
