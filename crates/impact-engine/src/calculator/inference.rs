//! Model inference energy from per-token coefficients

use super::{checked_coefficient, EnergyCalculator, EnergyEstimate};
use crate::error::{ImpactError, Result};
use crate::models::{dimensions, ServiceType, TrainingFootprint, UsageRecord};
use crate::reference::ReferenceStore;

pub struct InferenceCalculator;

/// Training carbon attributable to one inference
pub(crate) fn amortized_per_inference(model_id: &str, training: &TrainingFootprint) -> Result<f64> {
    let total = checked_coefficient(model_id, "total_emissions_gco2e", training.total_emissions_gco2e)?;
    if !training.expected_inferences.is_finite() || training.expected_inferences <= 0.0 {
        return Err(ImpactError::integrity(
            model_id,
            "expected_inferences",
            training.expected_inferences,
            "expected inference count must be positive",
        ));
    }
    Ok(total / training.expected_inferences)
}

impl EnergyCalculator for InferenceCalculator {
    fn service_type(&self) -> ServiceType {
        ServiceType::ModelInference
    }

    fn estimate_energy(&self, record: &UsageRecord, store: &ReferenceStore) -> Result<EnergyEstimate> {
        let profile = store.lookup_model(record.resource_id())?;
        let model_id = profile.model_id.as_str();

        let input_wh = checked_coefficient(
            model_id,
            "input_energy_wh_per_token",
            profile.input_energy_wh_per_token,
        )?;
        let output_wh = checked_coefficient(
            model_id,
            "output_energy_wh_per_token",
            profile.output_energy_wh_per_token,
        )?;

        let energy_wh = record.quantity(dimensions::INPUT_TOKENS) * input_wh
            + record.quantity(dimensions::OUTPUT_TOKENS) * output_wh;

        let embodied_gco2e = match &profile.training {
            Some(training) => {
                let inferences = record.quantity_or(dimensions::INFERENCES, 1.0);
                amortized_per_inference(model_id, training)? * inferences
            }
            None => 0.0,
        };

        Ok(EnergyEstimate {
            energy_wh,
            resource_class: model_id.to_string(),
            embodied_gco2e,
            vcpu_hours: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_amortization() {
        let training = TrainingFootprint {
            total_emissions_gco2e: 175_000_000.0,
            expected_inferences: 1_000_000_000.0,
        };
        assert_relative_eq!(amortized_per_inference("claude-3-haiku", &training).unwrap(), 0.175, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_expected_inferences_is_integrity_fault() {
        let training = TrainingFootprint {
            total_emissions_gco2e: 1000.0,
            expected_inferences: 0.0,
        };
        assert!(matches!(
            amortized_per_inference("m", &training),
            Err(ImpactError::DataIntegrity { .. })
        ));
    }
}
